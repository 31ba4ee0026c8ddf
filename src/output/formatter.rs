use colored::Colorize;

use crate::planner::diff::TableDelta;
use crate::planner::plan::{Plan, PlannedChange};

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg.green());
}

/// Print an error message.
pub fn print_error(msg: &str) {
    println!("{} {}", "✗".red().bold(), msg.red());
}

/// Print an execution plan in a Terraform-like format.
pub fn print_plan(plan: &Plan) {
    println!();

    if plan.is_empty() {
        println!("{}", "No changes. Schema is up-to-date.".green());
        return;
    }

    println!("Aquaform computed the following execution plan.");
    println!("Resource actions are indicated with the following symbols:");
    if plan.creates() > 0 {
        println!("  {} create", "+".green().bold());
    }
    if plan.updates() > 0 {
        println!("  {} update in-place", "~".yellow().bold());
    }
    if plan.deletes() > 0 {
        println!("  {} destroy", "-".red().bold());
    }

    println!();
    println!("Aquaform will perform the following actions:");
    println!();

    for change in &plan.changes {
        match change {
            PlannedChange::Create { resource_id, table } => {
                print_header(resource_id, &table.name, "will be created");
                for col in &table.columns {
                    let mut line = format!("      + column \"{}\" {}", col.name, col.sql_type);
                    if !col.nullable {
                        line.push_str(" NOT NULL");
                    }
                    if let Some(default) = &col.default {
                        line.push_str(&format!(" DEFAULT {}", default));
                    }
                    println!("{}", line.green());
                }
                let pk = format!("      + primary key ({})", table.primary_key.join(", "));
                println!("{}", pk.green());
                for fk in &table.foreign_keys {
                    println!("{}", format!("      + {}", describe_fk(fk)).green());
                }
                println!();
            }
            PlannedChange::Update {
                resource_id,
                table,
                delta,
            } => {
                print_header(resource_id, &table.name, "will be updated in-place");
                print_delta(delta);
                println!();
            }
            PlannedChange::Delete {
                resource_id,
                table_name,
                ..
            } => {
                print_header(resource_id, table_name, "will be destroyed");
                println!();
            }
        }
    }

    println!("{}", plan);
    println!();
}

fn print_header(resource_id: &str, table_name: &str, action: &str) {
    println!(
        "  {} {} {}",
        "#".dimmed(),
        format!("{} (table \"{}\")", resource_id, table_name).bold(),
        action.dimmed()
    );
}

fn print_delta(delta: &TableDelta) {
    for col in &delta.add_columns {
        let mut line = format!("      + add column \"{}\" {}", col.name, col.sql_type);
        if !col.nullable {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = &col.default {
            line.push_str(&format!(" DEFAULT {}", default));
        }
        println!("{}", line.green());
    }

    for (old, new) in &delta.modify_columns {
        let mut what = Vec::new();
        if old.sql_type != new.sql_type {
            what.push(format!("{} → {}", old.sql_type, new.sql_type));
        }
        if old.nullable != new.nullable {
            what.push(if new.nullable {
                "drop NOT NULL".to_string()
            } else {
                "set NOT NULL".to_string()
            });
        }
        if old.default != new.default {
            what.push(match &new.default {
                Some(d) => format!("default {}", d),
                None => "drop default".to_string(),
            });
        }
        let line = format!(
            "      ~ modify column \"{}\" ({})",
            new.name,
            what.join(", ")
        );
        println!("{}", line.yellow());
    }

    for col in &delta.remove_columns {
        println!("{}", format!("      - drop column \"{}\"", col.name).red());
    }

    if let Some((old_pk, new_pk)) = &delta.modify_primary_key {
        let line = format!(
            "      ~ replace primary key ({} → {})",
            old_pk.join(", "),
            new_pk.join(", ")
        );
        println!("{}", line.yellow());
    }

    for fk in &delta.add_foreign_keys {
        println!("{}", format!("      + add {}", describe_fk(fk)).green());
    }

    for fk in &delta.remove_foreign_keys {
        println!("{}", format!("      - drop {}", describe_fk(fk)).red());
    }
}

fn describe_fk(fk: &crate::config::types::ForeignKey) -> String {
    format!(
        "foreign key ({}) → {} ({})",
        fk.columns.join(", "),
        fk.reference_table,
        fk.reference_columns.join(", ")
    )
}
