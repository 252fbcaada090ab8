use crate::{
    app::{App, Screen},
    config::Config,
    Args,
};
use anyhow::{anyhow, Result};
use rpassword::prompt_password;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;

pub struct Context {
    pub args: Args,
    pub config: Config,
    pub session_id: String,
    pub app: RefCell<App>,
}

pub fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

/// Outcome of one REPL step
enum Flow {
    Continue,
    Exit,
}

/// Sign in once with the given credentials and print the resulting screen
pub fn run_login(ctx: &Context, email: &str, password: &str) -> Result<()> {
    let mut app = ctx.app.borrow_mut();
    verbose(ctx, &format!("POST {}/admin/login as {}", ctx.config.base_url(), email));
    if !app.submit_login(email, password) {
        return Err(anyhow!("Email and password are required"));
    }
    println!("{}", app.render());
    if app.screen() == Screen::Login {
        return Err(anyhow!("{}", app.session().error()));
    }
    Ok(())
}

pub fn run_logout(ctx: &Context) -> Result<()> {
    ctx.app.borrow_mut().logout();
    println!("Signed out.");
    Ok(())
}

/// Print the current screen once, fetching bookings if signed in
pub fn run_print(ctx: &Context) -> Result<()> {
    let mut app = ctx.app.borrow_mut();
    app.activate();
    println!("{}", app.render());
    if app.screen() == Screen::Login {
        println!("Not signed in. Run bookdesk interactively or pass --email/--password.");
    }
    Ok(())
}

pub fn run_status(ctx: &Context) -> Result<()> {
    let app = ctx.app.borrow();
    let state = if app.session().is_authenticated() {
        "signed in"
    } else {
        "signed out"
    };
    println!("Session: {}", state);
    println!("API: {}", ctx.config.base_url());
    println!("Storage: {}", ctx.config.storage_path().display());
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("bookdesk - type /help for commands, /exit to quit");
    ctx.app.borrow_mut().activate();

    loop {
        println!("{}", ctx.app.borrow().render());

        let screen = ctx.app.borrow().screen();
        let step = match screen {
            Screen::Login => login_step(&ctx, &mut rl),
            Screen::Dashboard => dashboard_step(&ctx, &mut rl),
        };

        match step {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn login_step(ctx: &Context, rl: &mut DefaultEditor) -> Result<Flow, ReadlineError> {
    let previous = ctx.app.borrow().form().email.clone();
    let email = rl.readline_with_initial("Email: ", (previous.as_str(), ""))?;
    let email = email.trim();
    if email.starts_with('/') {
        rl.add_history_entry(email)?;
        return Ok(handle_command(ctx, email));
    }

    // no echo, no history
    let password = prompt_password("Password: ")?;

    let mut app = ctx.app.borrow_mut();
    verbose(ctx, &format!("POST {}/admin/login as {}", ctx.config.base_url(), email));
    if !app.submit_login(email, &password) {
        println!("Email and password are required.");
        return Ok(Flow::Continue);
    }
    if app.screen() == Screen::Dashboard {
        verbose(ctx, &format!("signed in as {}", email));
    }
    Ok(Flow::Continue)
}

fn dashboard_step(ctx: &Context, rl: &mut DefaultEditor) -> Result<Flow, ReadlineError> {
    loop {
        let line = rl.readline(">>> ")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)?;

        if line.starts_with('/') {
            return Ok(handle_command(ctx, line));
        }
        println!("Unknown input: {} (type /help for commands)", line);
    }
}

fn handle_command(ctx: &Context, cmd: &str) -> Flow {
    let parts: Vec<&str> = cmd.splitn(2, ' ').collect();
    match parts[0] {
        "/exit" | "/quit" => return Flow::Exit,
        "/help" => {
            println!("Commands:");
            println!("  /exit           - quit");
            println!("  /help           - show commands");
            println!("  /session        - show session info");
            println!("  /logout         - sign out");
            println!("On the login screen, enter your email and password when prompted.");
        }
        "/session" => {
            let app = ctx.app.borrow();
            println!("Session: {}", ctx.session_id);
            println!("API: {}", ctx.config.base_url());
            println!(
                "Signed in: {}",
                if app.session().is_authenticated() { "yes" } else { "no" }
            );
            if let Some(path) = app.transcript_path() {
                println!("Transcript: {:?}", path);
            }
        }
        "/logout" => {
            let mut app = ctx.app.borrow_mut();
            if app.session().is_authenticated() {
                app.logout();
                println!("Signed out.");
            } else {
                println!("Not signed in.");
            }
        }
        _ => println!("Unknown command: {}", parts[0]),
    }
    Flow::Continue
}
