//! `wterm hosts`: list the host book from the config file.

use anyhow::Result;

use crate::config::Config;

/// Print every configured host.
pub fn run(cfg: &Config) -> Result<()> {
    if cfg.hosts.is_empty() {
        println!("No hosts configured. Add [[hosts]] entries to ~/.wterm/config.toml.");
        return Ok(());
    }

    println!("{:<6} {:<16} {:<24} {:<6} {}", "ID", "NAME", "ADDRESS", "TYPE", "USER");
    for host in &cfg.hosts {
        let address = if host.host.is_empty() {
            "-".to_string()
        } else {
            format!("{}:{}", host.host, host.port)
        };
        let kind = match host.connection_type.as_str() {
            "0" => "pass",
            "1" => "key",
            other => other,
        };
        let user = if host.user.is_empty() { "-" } else { &host.user };
        println!(
            "{:<6} {:<16} {:<24} {:<6} {}",
            host.id, host.name, address, kind, user
        );
    }

    println!("\n{} host(s) configured.", cfg.hosts.len());
    Ok(())
}
