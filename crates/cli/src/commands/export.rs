use std::fs;
use std::io::Write;
use std::path::Path;

use crate::commands::CommandResult;
use leadline_core::config::{AppConfig, LoadOptions};
use leadline_core::domain::category::CategoryId;
use leadline_core::domain::lead::LeadStatus;
use leadline_core::export::render_csv;
use leadline_db::repositories::{LeadFilter, LeadRepository, SqlLeadRepository};
use leadline_db::{connect, migrations};

pub fn run(output: Option<&Path>, status: Option<&str>, category: Option<&str>) -> CommandResult {
    let mut filter = LeadFilter::default();

    if let Some(raw) = status {
        match LeadStatus::parse(raw) {
            Some(parsed) => filter.status = Some(parsed),
            None => {
                return CommandResult::failure(
                    "export",
                    "invalid_filter",
                    format!("unknown lead status `{raw}` (expected new, sent, converted, returned)"),
                    2,
                );
            }
        }
    }
    if let Some(raw) = category {
        filter.category_id = Some(CategoryId(raw.to_string()));
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "export",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "export",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let leads = SqlLeadRepository::new(pool.clone())
            .list(&filter)
            .await
            .map_err(|error| ("query", error.to_string(), 4u8));
        pool.close().await;
        leads
    });

    let leads = match result {
        Ok(leads) => leads,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("export", error_class, message, exit_code);
        }
    };

    let row_count = leads.len();
    let bytes = match render_csv(&leads) {
        Ok(bytes) => bytes,
        Err(error) => {
            return CommandResult::failure("export", "csv_render", error.to_string(), 7);
        }
    };

    match output {
        Some(path) => match fs::write(path, &bytes) {
            Ok(()) => CommandResult::success(
                "export",
                format!("wrote {row_count} leads to {}", path.display()),
            ),
            Err(error) => CommandResult::failure(
                "export",
                "write_output",
                format!("could not write `{}`: {error}", path.display()),
                7,
            ),
        },
        None => {
            // CSV bytes go straight to stdout; the status envelope moves to stderr
            // so piping the output into a file stays clean.
            let mut stdout = std::io::stdout().lock();
            if let Err(error) = stdout.write_all(&bytes).and_then(|()| stdout.flush()) {
                return CommandResult::failure(
                    "export",
                    "write_output",
                    format!("could not write to stdout: {error}"),
                    7,
                );
            }
            let result =
                CommandResult::success("export", format!("wrote {row_count} leads to stdout"));
            eprintln!("{}", result.output);
            CommandResult { exit_code: 0, output: String::new() }
        }
    }
}
