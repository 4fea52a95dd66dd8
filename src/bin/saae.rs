//! An interactive terminal front-end.
//!
//! Usage: `saae [settings.json]`. Set the RUST_LOG environment variable to see what happens under the hood.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};

use saae::App;
use saae::navigation::{Navigation, Route};
use saae::config::Settings;
use saae::location::{FixedLocation, LocationProvider};
use saae::prayer::{AladhanClient, PrayerTimesSource};
use saae::store::{with_policy, FirestoreStore, TaskStore};

type SaaeApp = App<dyn TaskStore, dyn LocationProvider, dyn PrayerTimesSource>;

const USAGE: &str = r#"Usage: saae <settings.json>

The settings file needs at least the Firestore project that holds the tasks:
    {
        "store": { "project_id": "my-project", "api_key": "..." },
        "location": { "latitude": 21.4225, "longitude": 39.8262 }
    }
Without a location, the prayer times screen behaves as if location access had been denied."#;

const HELP: &str = "Commands:
    list            go back to the task list (or reconnect it)
    add <title>     add a task
    toggle <n>      mark task n as done (or not done)
    delete <n>      delete task n
    prayer          show today's prayer times
    back            go back to the task list
    help            show this help
    quit            exit";


#[derive(Debug, PartialEq)]
enum Command {
    Add(String),
    Toggle(usize),
    Delete(usize),
    Prayer,
    List,
    Back,
    Help,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (verb, arg) = match line.find(char::is_whitespace) {
            Some(pos) => (&line[..pos], line[pos..].trim()),
            None => (line, ""),
        };

        match verb {
            "add" if arg.is_empty() => Err("Usage: add <title>".to_string()),
            "add" => Ok(Command::Add(arg.to_string())),
            "toggle" => parse_index(arg).map(Command::Toggle),
            "delete" => parse_index(arg).map(Command::Delete),
            "prayer" => Ok(Command::Prayer),
            "list" => Ok(Command::List),
            "back" => Ok(Command::Back),
            "help" | "" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command {:?}", other)),
        }
    }
}

/// Parse a 1-based task number
fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("{:?} is not a task number", arg)),
    }
}

enum Event {
    Input(Option<String>),
    Delivery(bool),
}


#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_file(Path::new(&path))?,
        None => Settings::default(),
    };
    if let Err(err) = check_settings(&settings) {
        eprintln!("{}\n", USAGE);
        return Err(err.into());
    }

    let store = with_policy(FirestoreStore::new(&settings.store)?, settings.write_policy);
    let location: Arc<dyn LocationProvider> = Arc::new(FixedLocation::new(settings.location));
    let prayer_times: Arc<dyn PrayerTimesSource> = Arc::new(AladhanClient::new(&settings.prayer)?);

    let mut app: SaaeApp = App::start(store, location, prayer_times).await?;
    print_screen(&mut app);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = match app.task_list() {
            Some(list) if list.is_active() => tokio::select! {
                line = lines.next_line() => Event::Input(line?),
                delivered = list.next_notification() => Event::Delivery(delivered),
            },
            _ => Event::Input(lines.next_line().await?),
        };

        match event {
            Event::Delivery(true) => {},
            Event::Delivery(false) => {
                if let Some(list) = app.task_list() {
                    list.deactivate();
                }
                println!("The task store has stopped sending updates. Type `list` to reconnect");
            },
            Event::Input(None) => break,
            Event::Input(Some(line)) => match Command::parse(&line) {
                Err(err) => {
                    println!("{}", err);
                    continue;
                },
                Ok(Command::Quit) => break,
                Ok(Command::Help) => {
                    println!("{}", HELP);
                    continue;
                },
                Ok(command) => handle(&mut app, command).await,
            },
        }
        print_screen(&mut app);
    }

    log::info!("Bye");
    Ok(())
}

/// Make sure the settings are enough to start
fn check_settings(settings: &Settings) -> Result<(), String> {
    if settings.store.project_id.is_empty() {
        return Err("No Firestore project id has been configured".to_string());
    }
    Ok(())
}

async fn handle(app: &mut SaaeApp, command: Command) {
    match command {
        Command::Prayer => {
            let navigation = match app.task_list() {
                None => return,
                Some(list) => list.navigate(),
            };
            println!("Loading...");
            follow(app, navigation).await;
        },
        Command::List => follow(app, Navigation::To(Route::List)).await,
        Command::Back => {
            let navigation = match app.prayer_times() {
                None => return,
                Some(screen) => screen.go_back(),
            };
            follow(app, navigation).await;
        },
        Command::Add(title) => {
            let list = match app.task_list() {
                None => return not_on_list(),
                Some(list) => list,
            };
            list.set_draft(title);
            if let Err(err) = list.submit_draft().await {
                println!("Could not add the task: {}", err);
            }
        },
        Command::Toggle(index) => edit_task(app, index, true).await,
        Command::Delete(index) => edit_task(app, index, false).await,
        Command::Help | Command::Quit => {},
    }
}

/// Navigation failures are reported, and the current screen stays displayed
async fn follow(app: &mut SaaeApp, navigation: Navigation) {
    if let Err(err) = app.navigate(navigation).await {
        println!("Could not open the next screen: {}. Still on {}", err, app.route());
    }
}

/// Toggle or delete the task displayed at `index`
async fn edit_task(app: &mut SaaeApp, index: usize, toggle: bool) {
    let list = match app.task_list() {
        None => return not_on_list(),
        Some(list) => list,
    };
    let task = match list.tasks().get(index) {
        None => {
            println!("There is no task #{}", index + 1);
            return;
        },
        Some(task) => task.clone(),
    };

    let result = if toggle { list.toggle(&task).await } else { list.delete(&task).await };
    if let Err(err) = result {
        println!("Could not update \"{}\": {}", task.title(), err);
    }
}

fn not_on_list() {
    println!("Go back to the task list first");
}

fn print_screen(app: &mut SaaeApp) {
    if let Some(list) = app.task_list() {
        list.process_notifications();
    }

    println!();
    for line in app.render() {
        println!("{}", line);
    }

    let next = app.prayer_times()
        .and_then(|screen| screen.timings())
        .and_then(|timings| timings.next_after(Local::now().time()));
    if let Some((prayer, time)) = next {
        println!("Next prayer: {} at {}", prayer, time.format("%H:%M"));
    }
}
