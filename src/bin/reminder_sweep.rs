//! One-shot notification backfill over every stored task.

use chrono::Utc;
use taskplanner::config::PlannerConfig;
use taskplanner::core::notification::Notification;
use taskplanner::core::task::DEFAULT_USER_ID;
use taskplanner::planner::Planner;

#[tokio::main]
async fn main() {
    let test_mode = std::env::args().skip(1).any(|a| a == "--test");

    let config = match PlannerConfig::load(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };
    taskplanner::logging::init("taskplanner-reminder-sweep", None, config.debug_logging);

    let planner = match Planner::new(&config) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Failed to open data directory: {}", e);
            std::process::exit(1);
        }
    };

    println!("=== Reminder sweep: {} ===\n", config.data_dir.display());

    let now = Utc::now();
    match planner.sweep_reminders(now) {
        Ok(report) => {
            println!("Tasks:                  {}", report.tasks);
            println!("New-task notifications: {}", report.new_task);
            println!("Reminders:              {}", report.reminders);
            println!("Deadline notices:       {}", report.deadlines);
            println!("\nCreated {} notifications", report.created());
        }
        Err(e) => {
            eprintln!("Sweep failed: {}", e);
            std::process::exit(1);
        }
    }

    if test_mode {
        match planner.append_notification(Notification::test(DEFAULT_USER_ID, now)) {
            Ok(n) => println!("Test notification added ({})", n.id),
            Err(e) => {
                eprintln!("Failed to add test notification: {}", e);
                std::process::exit(1);
            }
        }
    }

    match planner.list_notifications(None, true) {
        Ok(unread) => println!("{} unread notifications", unread.len()),
        Err(e) => eprintln!("Failed to count notifications: {}", e),
    }
}
