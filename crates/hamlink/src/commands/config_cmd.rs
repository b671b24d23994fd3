//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};
use hamlink_config::{
    Config, config_path, load_config, load_config_or_default, save_config, store_login_password,
};
use hamlink_core::QueryApis;
use secrecy::{ExposeSecret, SecretString};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn target_path(global: &GlobalOpts) -> std::path::PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

fn ask_password(user: &str) -> Result<SecretString, CliError> {
    let password = Password::new()
        .with_prompt(format!("RouterOS API password for {user}"))
        .interact()
        .map_err(prompt_err)?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "login_password".into(),
            reason: "password cannot be empty".into(),
        });
    }
    Ok(SecretString::from(password))
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let path = target_path(global);
    eprintln!("hamlink configuration wizard");
    eprintln!("   Config path: {}\n", path.display());

    let mut cfg = Config::default();

    cfg.query.community = Input::new()
        .with_prompt("SNMP community")
        .default(cfg.query.community.clone())
        .interact_text()
        .map_err(prompt_err)?;

    let timeout: String = Input::new()
        .with_prompt("Request timeout")
        .default(cfg.query.timeout.clone())
        .validate_with(|s: &String| {
            humantime::parse_duration(s)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;
    cfg.query.timeout = timeout;

    let api_choices = &["SNMP only", "SNMP and RouterOS API"];
    let apis = Select::new()
        .with_prompt("Query APIs")
        .items(api_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if apis == 1 {
        cfg.query.allowed_apis = QueryApis::ALL;
        let user: String = Input::new()
            .with_prompt("RouterOS API user")
            .interact_text()
            .map_err(prompt_err)?;
        let password = ask_password(&user)?;

        let store_choices = &[
            "Store in system keyring (recommended)",
            "Save to config file (plaintext)",
        ];
        let store = Select::new()
            .with_prompt("Where to store the password?")
            .items(store_choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        if store == 0 {
            store_login_password(&user, &password)?;
            eprintln!("   Password stored in system keyring");
        } else {
            cfg.query.login_password = Some(password.expose_secret().to_owned());
        }
        cfg.query.login_user = Some(user);
    }

    cfg.query.enable_caching = Confirm::new()
        .with_prompt("Cache device data between runs?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    save_config(&cfg, &path)?;
    eprintln!("\nConfiguration written to {}", path.display());
    eprintln!("  Add [[links]] entries to use `hamlink sweep`.");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&target_path(global).display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let mut cfg = load_config_or_default(global.config.as_deref());
            if cfg.query.login_password.is_some() {
                cfg.query.login_password = Some("********".into());
            }
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# cannot render: {e}")),
                |_| target_path(global).display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init => init(global),

        ConfigCommand::SetPassword { user } => {
            let cfg = load_config(global.config.as_deref())?;
            let user = user
                .or_else(|| global.login_user.clone())
                .or(cfg.query.login_user)
                .ok_or_else(|| CliError::Validation {
                    field: "user".into(),
                    reason: "no RouterOS API user given or configured".into(),
                })?;
            let password = ask_password(&user)?;
            store_login_password(&user, &password)?;
            eprintln!("Password for {user} stored in system keyring");
            Ok(())
        }
    }
}
