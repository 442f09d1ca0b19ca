// policy.rs — Policy subcommands: show, check.

use anyhow::Context as _;
use clap::Subcommand;
use fl_context::Stage;
use fl_orchestrator::ProjectConfig;
use fl_policy::{ActionName, PermissionRequest, Role};
use serde::de::DeserializeOwned;

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Print the permission table in effect.
    Show {
        /// Only grants held by this role (e.g., "reviewer").
        #[arg(long)]
        role: Option<String>,
        /// Print the table as YAML (loadable via `runs.permissions`).
        #[arg(long)]
        yaml: bool,
    },
    /// Evaluate one (role, action, stage) request and show every check.
    Check {
        role: String,
        action: String,
        stage: String,
    },
}

pub fn execute(cmd: &PolicyCommands, config: &ProjectConfig) -> anyhow::Result<()> {
    match cmd {
        PolicyCommands::Show { role, yaml } => show(config, role.as_deref(), *yaml),
        PolicyCommands::Check {
            role,
            action,
            stage,
        } => check(config, role, action, stage),
    }
}

fn show(config: &ProjectConfig, role: Option<&str>, yaml: bool) -> anyhow::Result<()> {
    let table = config.permission_table()?;
    if yaml {
        print!("{}", table.to_yaml()?);
        return Ok(());
    }

    let role: Option<Role> = role.map(|r| parse_name("role", r)).transpose()?;
    println!("{:<12} {:<20} {:<10} STAGES", "ROLE", "ACTION", "MUTATES");
    println!("{}", "-".repeat(60));
    for grant in table.grants() {
        if role.is_some_and(|r| r != grant.role) {
            continue;
        }
        let stages: Vec<&str> = grant.stages.iter().map(|s| s.as_str()).collect();
        println!(
            "{:<12} {:<20} {:<10} {}",
            grant.role.as_str(),
            grant.action.as_str(),
            if grant.action.is_mutation() { "yes" } else { "no" },
            stages.join(", ")
        );
    }
    Ok(())
}

fn check(config: &ProjectConfig, role: &str, action: &str, stage: &str) -> anyhow::Result<()> {
    let table = config.permission_table()?;
    let request = PermissionRequest {
        role: parse_name::<Role>("role", role)?,
        action: parse_name::<ActionName>("action", action)?,
        stage: parse_name::<Stage>("stage", stage)?,
    };
    let trace = table.evaluate_with_trace(&request);

    for step in &trace.steps {
        let marker = if step.terminal { "*" } else { " " };
        println!("{} {:<14} {}", marker, step.check, step.outcome);
    }
    if let Some(grant) = &trace.matching_grant {
        println!("Matched: {}", grant);
    }
    println!("Decision: {}", serde_json::to_string(&trace.decision)?);
    Ok(())
}

/// Parse a snake_case name the way the YAML and JSON formats spell it.
fn parse_name<T: DeserializeOwned>(kind: &str, name: &str) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .with_context(|| format!("unknown {} '{}'", kind, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_in_snake_case() {
        assert_eq!(parse_name::<Role>("role", "revisor").unwrap(), Role::Revisor);
        assert_eq!(
            parse_name::<ActionName>("action", "submit_feedback").unwrap(),
            ActionName::SubmitFeedback
        );
        assert_eq!(parse_name::<Stage>("stage", "finalize").unwrap(), Stage::Finalize);
        assert!(parse_name::<Role>("role", "editor").is_err());
    }

    #[test]
    fn commands_run_against_the_standard_table() {
        let config = ProjectConfig::for_project(".");
        execute(
            &PolicyCommands::Show {
                role: Some("drafter".to_string()),
                yaml: false,
            },
            &config,
        )
        .unwrap();
        execute(
            &PolicyCommands::Check {
                role: "reviewer".to_string(),
                action: "submit_draft".to_string(),
                stage: "create".to_string(),
            },
            &config,
        )
        .unwrap();
    }
}
