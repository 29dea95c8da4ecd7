//! CLI output formatting utilities

use colored::Colorize;

use crate::auth::SessionClaims;

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Print decoded token claims
pub fn print_claims(claims: &SessionClaims) {
    println!("{}", "Token Claims".bold().underline());
    println!();
    println!("  {} {}", "User ID:".bold(), claims.subject_id);

    for (label, ts) in [("Issued:", claims.iat), ("Expires:", claims.exp)] {
        match chrono::DateTime::from_timestamp(ts, 0) {
            Some(at) => println!("  {} {}", label.bold(), at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("  {} {}", label.bold(), ts),
        }
    }

    for (key, value) in &claims.extra {
        println!("  {} {}", format!("{}:", key).bold(), value.to_string().cyan());
    }
}
