use anyhow::Result;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use rules_engine::RuleMatch;
use secl_eval::{FieldEventType, RejectedRule};
use secl_model::FieldInfo;

use super::{EventMatches, EventValue};

pub struct TermPrinted;

pub trait TermPrintable {
    fn term_print(&self) -> Result<TermPrinted>;
}

impl TermPrintable for String {
    fn term_print(&self) -> Result<TermPrinted> {
        println!("{self}");
        Ok(TermPrinted)
    }
}

impl TermPrintable for Vec<FieldInfo> {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("FIELD").add_attribute(Attribute::Bold),
            Cell::new("TYPE").add_attribute(Attribute::Bold),
            Cell::new("EVENT TYPE").add_attribute(Attribute::Bold),
            Cell::new("WEIGHT").add_attribute(Attribute::Bold),
        ]);

        for field in self {
            let field_type = if field.is_array {
                format!("[]{}", field.field_type)
            } else {
                field.field_type.to_string()
            };
            let event_type_color = match field.event_type {
                FieldEventType::Any => Color::Yellow,
                FieldEventType::Only(_) => Color::White,
            };

            table.add_row(vec![
                Cell::new(field.name)
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new(field_type),
                Cell::new(field.event_type).fg(event_type_color),
                Cell::new(field.weight),
            ]);
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

impl TermPrintable for Vec<EventMatches> {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("EVENT").add_attribute(Attribute::Bold),
            Cell::new("TYPE").add_attribute(Attribute::Bold),
            Cell::new("RULE").add_attribute(Attribute::Bold),
            Cell::new("SEVERITY").add_attribute(Attribute::Bold),
            Cell::new("VALUES").add_attribute(Attribute::Bold),
        ]);

        for event in self {
            for RuleMatch {
                rule_name,
                metadata,
                values,
            } in &event.matches
            {
                let values = values
                    .iter()
                    .map(|(field, value)| format!("{field}={value}"))
                    .collect::<Vec<_>>()
                    .join("\n");

                table.add_row(vec![
                    Cell::new(event.index),
                    Cell::new(event.event_type),
                    Cell::new(rule_name)
                        .fg(Color::Red)
                        .add_attribute(Attribute::Bold),
                    Cell::new(metadata.severity.as_deref().unwrap_or("-")),
                    Cell::new(values),
                ]);
            }
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

impl TermPrintable for Vec<RejectedRule> {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("REJECTED RULE").add_attribute(Attribute::Bold),
            Cell::new("ERROR").add_attribute(Attribute::Bold),
        ]);

        for rejected in self {
            table.add_row(vec![
                Cell::new(&rejected.name)
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold),
                Cell::new(&rejected.error).fg(Color::Red),
            ]);
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

impl TermPrintable for Vec<EventValue> {
    fn term_print(&self) -> Result<TermPrinted> {
        let mut table = table();

        table.set_header(vec![
            Cell::new("EVENT").add_attribute(Attribute::Bold),
            Cell::new("TYPE").add_attribute(Attribute::Bold),
            Cell::new("VALUE").add_attribute(Attribute::Bold),
        ]);

        for event in self {
            table.add_row(vec![
                Cell::new(event.index),
                Cell::new(event.event_type),
                Cell::new(&event.value).fg(Color::Green),
            ]);
        }

        println!("{table}");
        Ok(TermPrinted)
    }
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table
}
