use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are never listed here
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "SF_HOST",
        "SF_PORT",
        "SF_DATABASE_URL",
        "SF_USE_X_FORWARDED_FOR",
        "SF_USE_FORWARDED",
        "SF_UNPAID_ORDER_TIMEOUT",
        "SF_WEBHOOK_SIGNATURE_CHECKS",
        "SF_PAYSTACK_BASE_URL",
        "SF_FLUTTERWAVE_BASE_URL",
        "SF_STRIPE_BASE_URL",
        "SF_STRIPE_TOLERANCE_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
