use anyhow::Result;
use colored::Colorize;
use lumo_editor::{Registry, ResolverEntry};

pub fn widgets() -> Result<()> {
    let registry = Registry::builtin();

    println!("🧩 {} widget types", registry.len().to_string().bold());
    println!();

    for tag in registry.tags() {
        let entry = registry.resolve(tag)?;
        println!("{}", describe(tag, entry));
    }

    Ok(())
}

fn describe(tag: &str, entry: &ResolverEntry) -> String {
    let fields: Vec<&str> = entry.kind.fields().iter().map(|f| f.name).collect();
    let container = if entry.accepts_children() {
        " [container]"
    } else {
        ""
    };

    format!(
        "  {:<12}{}\n      fields: {}",
        tag,
        container,
        fields.join(", ")
    )
}
