use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use futures::future::join;

use habitflow_core::models::{Habit, RegisterRequest};
use habitflow_core::{AuthFailure, AuthSession, RequestOptions};

fn prompt_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(prompt).context("Failed to read password")
}

fn report(failure: AuthFailure) -> anyhow::Error {
    for (field, message) in &failure.field_errors {
        eprintln!("  {}: {}", field, message);
    }
    anyhow::anyhow!(failure.message)
}

/// Restore the saved session or explain how to create one
async fn require_session(session: &AuthSession) -> Result<()> {
    if session.restore().await.is_none() {
        bail!("Not signed in. Run `habitflow login <username>` first.");
    }
    Ok(())
}

pub async fn login(session: &AuthSession, username: &str) -> Result<()> {
    let password = prompt_password("Password: ")?;
    let user = session.login(username, &password).await.map_err(report)?;
    let name = user
        .map(|u| u.display_name())
        .unwrap_or_else(|| username.to_string());
    println!("Signed in as {}", name);
    Ok(())
}

pub async fn register(session: &AuthSession, username: &str, email: &str) -> Result<()> {
    let password = prompt_password("Password: ")?;
    let confirm = prompt_password("Confirm password: ")?;
    let request = RegisterRequest::new(username, email, &password, &confirm);
    session.register(&request).await.map_err(report)?;
    println!("Welcome to HabitFlow, {}!", username);
    Ok(())
}

pub fn logout(session: &AuthSession) {
    session.logout();
    println!("Signed out");
}

pub async fn whoami(session: &AuthSession) -> Result<()> {
    require_session(session).await?;
    match session.user() {
        Some(user) => {
            println!("{} (@{})", user.display_name(), user.username);
            if let Some(email) = user.email.filter(|e| !e.is_empty()) {
                println!("{}", email);
            }
        }
        None => println!("Signed in"),
    }
    Ok(())
}

fn print_habit(habit: &Habit, today: NaiveDate, due: bool) {
    let mark = if habit.completed_on(today) { "x" } else { " " };
    let due = if due { "due" } else { "" };
    println!(
        "[{}] {:<32} streak {:>3}  best {:>3}  {}",
        mark, habit.title, habit.current_streak, habit.best_streak, due
    );
}

pub async fn habits(session: &AuthSession) -> Result<()> {
    require_session(session).await?;
    let api = session.api();

    let (all, due) = join(api.habits(RequestOptions::new()), api.today_habits()).await;
    let all = all?.into_items();
    // The due list is a nicety; show habits without it
    let due_ids: Vec<i64> = due
        .map(|list| list.items().iter().map(|h| h.id).collect())
        .unwrap_or_default();

    if all.is_empty() {
        println!("No habits yet.");
        return Ok(());
    }
    let today = Local::now().date_naive();
    for habit in &all {
        print_habit(habit, today, due_ids.contains(&habit.id));
    }
    Ok(())
}

pub async fn today(session: &AuthSession) -> Result<()> {
    require_session(session).await?;
    let due = session.api().today_habits().await?.into_items();
    if due.is_empty() {
        println!("Nothing due today.");
        return Ok(());
    }
    let today = Local::now().date_naive();
    for habit in &due {
        print_habit(habit, today, true);
    }
    Ok(())
}

pub async fn profile(session: &AuthSession) -> Result<()> {
    require_session(session).await?;
    let api = session.api();

    let profile = api.profile().await?;
    if let Some(ref user) = profile.user {
        println!("{}", user.display_name());
    }
    if !profile.identity.is_empty() {
        println!("Identity:     {} ({}%)", profile.identity, profile.identity_progress);
    }
    println!("Level:        {}", profile.level);
    println!("Points:       {}", profile.total_points);
    println!("Streak:       {} (best {})", profile.current_streak, profile.best_streak);
    println!("Completions:  {}", profile.total_completions);

    let badges = api.user_badges().await?;
    if !badges.items().is_empty() {
        let names: Vec<&str> = badges.items().iter().map(|b| b.badge.name.as_str()).collect();
        println!("Badges:       {}", names.join(", "));
    }
    Ok(())
}
