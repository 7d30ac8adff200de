//! Onboarding - interactive terminal front-end.

use anyhow::Context;
use onboarding::otp::{INVALID_CODE_MESSAGE, RESEND_FAILED_MESSAGE, VERIFY_FAILED_MESSAGE};
use onboarding::submitter::REGISTER_FAILED_MESSAGE;
use onboarding::{
    Config, DraftInput, OnboardingFlow, OtpInput, PasswordChecks, Step, SubmitOutcome, View,
};
use registration_client::{RegistrationAuthority, RegistrationClient};
use session_store::Store;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::signal;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Lines = LinesStream<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.log.level);

    info!("Starting onboarding...");

    let store = if config.session.persist {
        Store::open(config.session.path.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to open session store at {}",
                    config.session.path.display()
                )
            })?
    } else {
        Store::memory()
    };
    info!(persistent = store.is_persistent(), "Session store ready");

    let client = RegistrationClient::new(config.authority.base_url.clone(), config.authority.timeout)
        .context("Failed to create registration client")?;
    info!("Registration authority: {}", client.base_url());
    let authority: Arc<dyn RegistrationAuthority> = Arc::new(client);

    let mut flow = OnboardingFlow::resume(Arc::new(store), authority)
        .await
        .context("Failed to resume onboarding")?;

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    tokio::select! {
        result = run(&mut flow, &mut lines) => result?,
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Shutting down...");
    Ok(())
}

/// Drive the flow until onboarding reaches the authenticated area or input ends.
async fn run(flow: &mut OnboardingFlow, lines: &mut Lines) -> anyhow::Result<()> {
    loop {
        match flow.view() {
            View::Step(Step::PersonalInfo) => {
                print_step(Step::PersonalInfo);
                let Some(input) = read_personal_info(lines).await? else {
                    return Ok(());
                };
                match flow.submit_personal_info(input).await {
                    Ok(_) => println!("Verification code sent."),
                    Err(e) => println!("{}", e.user_message(REGISTER_FAILED_MESSAGE)),
                }
            }
            View::OtpVerification => {
                if !verification_round(flow, lines).await? {
                    return Ok(());
                }
            }
            View::Step(step) => {
                print_step(step);
                println!("Your phone number is verified. You can continue onboarding.");
                return Ok(());
            }
        }
    }
}

async fn read_personal_info(lines: &mut Lines) -> anyhow::Result<Option<DraftInput>> {
    let Some(full_name) = prompt(lines, "Full name").await? else {
        return Ok(None);
    };
    let Some(email) = prompt(lines, "Email").await? else {
        return Ok(None);
    };
    let Some(phone_number) = prompt(lines, "Phone number").await? else {
        return Ok(None);
    };
    let Some(password) = prompt(lines, "Password").await? else {
        return Ok(None);
    };

    let checks = PasswordChecks::evaluate(&password);
    println!("  [{}] At least 8 characters", mark(checks.length));
    println!("  [{}] At least 1 special character", mark(checks.special));
    println!("  [{}] At least 1 number", mark(checks.number));

    let Some(confirm_password) = prompt(lines, "Confirm password").await? else {
        return Ok(None);
    };

    Ok(Some(DraftInput {
        full_name,
        email,
        phone_number,
        password,
        confirm_password,
    }))
}

/// One prompt on the verification view. Returns `false` once the user quits.
async fn verification_round(flow: &mut OnboardingFlow, lines: &mut Lines) -> anyhow::Result<bool> {
    if flow.otp().is_none() {
        if let Err(e) = flow.open_verification(None).await {
            println!("{}", e.user_message(VERIFY_FAILED_MESSAGE));
            return Ok(true);
        }
    }

    let Some(otp) = flow.otp() else {
        return Ok(true);
    };

    println!();
    println!("Enter the 6-digit code sent to {}", otp.masked_phone());
    if let Some(message) = otp.resend_error() {
        println!("{}", message);
    }
    match otp.cooldown() {
        0 => println!("Didn't get it? Type 'resend' for a new code."),
        seconds => println!("Resend available in {}s", seconds),
    }

    let Some(line) = prompt(lines, "Code").await? else {
        return Ok(false);
    };

    match line.trim() {
        "quit" => return Ok(false),
        "restart" => flow.start_over().await?,
        "resend" => match flow.resend().await {
            Ok(()) => println!("A new code has been sent."),
            Err(e) => println!("{}", e.user_message(RESEND_FAILED_MESSAGE)),
        },
        typed => {
            let mut input = OtpInput::new();
            input.replace(typed);
            if !input.can_submit() {
                println!("{}", INVALID_CODE_MESSAGE);
                return Ok(true);
            }

            match flow.submit_code(input.as_str()).await {
                Ok(SubmitOutcome::Verified(_)) => println!("Phone number verified."),
                Ok(SubmitOutcome::Failed(message) | SubmitOutcome::Rejected(message)) => {
                    println!("{}", message)
                }
                Ok(SubmitOutcome::Ignored | SubmitOutcome::Discarded) => {}
                Err(e) => println!("{}", e.user_message(VERIFY_FAILED_MESSAGE)),
            }
        }
    }

    Ok(true)
}

async fn prompt(lines: &mut Lines, label: &str) -> anyhow::Result<Option<String>> {
    print!("{}: ", label);
    std::io::stdout().flush()?;

    match lines.next().await {
        Some(line) => Ok(Some(line.context("Failed to read input")?)),
        None => Ok(None),
    }
}

fn print_step(step: Step) {
    println!();
    println!("Step {} of {}: {}", step.number(), Step::ALL.len(), step.title());
}

fn mark(met: bool) -> char {
    if met {
        'x'
    } else {
        ' '
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
