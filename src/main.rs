use anyhow::{bail, Context, Result};
use nocode_designer::{
    cli::{Cli, Commands},
    formula::{FormulaBuilder, TokenKind},
    ident::transliterate,
    logging::{self, LoggingConfig},
    project::{Designer, Project, ProjectStore},
    schema::{list_types, FieldUpdate, Table},
    DesignerConfig,
};
use serde_json::{Map, Value};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    logging::init(LoggingConfig::from_verbosity(cli.verbose))?;

    let config = DesignerConfig::resolve(cli.projects_dir)?.with_autosave(true);

    match cli.command {
        Commands::New {
            name,
            description,
            author,
        } => {
            let store = ProjectStore::from_config(&config)?;
            let mut project = Project::new(&name)?;
            project.description = description.unwrap_or_default();
            project.author = author.unwrap_or_default();

            let path = store.default_path(&project);
            if path.exists() {
                bail!("Project file {:?} already exists", path);
            }
            let path = store.save(&mut project, Some(&path))?;
            println!("Created project '{}' at {:?}", project.name, path);
        }

        Commands::List => {
            let store = ProjectStore::from_config(&config)?;
            let projects = store.list()?;
            if projects.is_empty() {
                println!("No projects in {:?}", store.projects_dir());
            }
            for p in projects {
                println!("  {:<30} {:<24} {}", p.name, p.modified, p.file);
                if !p.description.is_empty() {
                    println!("      {}", p.description);
                }
            }
        }

        Commands::Show { project, json } => {
            let designer = open(&config, &project)?;
            if json {
                println!("{}", serde_json::to_string_pretty(designer.project())?);
            } else {
                print_project(designer.project());
            }
        }

        Commands::Types => {
            println!("Available field types:\n");
            for t in list_types() {
                println!("  {} {:<16} {:<24} {}", t.icon, t.type_id.as_str(), t.display_name, t.description);
            }
        }

        Commands::Translit { text } => {
            println!("{}", transliterate(&text));
        }

        Commands::AddTable { project, name } => {
            let mut designer = open(&config, &project)?;
            let event = designer.create_table(&name)?;
            println!("{}", event);
        }

        Commands::RenameTable {
            project,
            table,
            new_name,
        } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            println!("{}", designer.rename_table(&table_id, &new_name)?);
        }

        Commands::DeleteTable { project, table } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            println!("{}", designer.delete_table(&table_id)?);
        }

        Commands::AddField {
            project,
            table,
            field_type,
            name,
        } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            let event = designer.create_field(&table_id, &field_type)?;
            println!("{}", event);

            if let (Some(name), Some(field_id)) = (name, event.field_id()) {
                let update = FieldUpdate::new().name(name);
                println!("{}", designer.update_field(&table_id, field_id, &update)?);
            }
        }

        Commands::SetField {
            project,
            table,
            field,
            properties,
            reset,
        } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            let field_id = field_id(&designer, &table_id, &field)?;

            let props: Map<String, Value> =
                serde_json::from_str(&properties).context("Properties must be a JSON object")?;
            let (update, unknown) = FieldUpdate::from_properties(&props)?;
            if !unknown.is_empty() {
                eprintln!("Ignoring unknown properties: {}", unknown.join(", "));
            }

            let event = if reset {
                designer.reset_and_update_field(&table_id, &field_id, &update)?
            } else {
                designer.update_field(&table_id, &field_id, &update)?
            };
            println!("{}", event);
        }

        Commands::MoveField {
            project,
            table,
            field,
            direction,
        } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            let field_id = field_id(&designer, &table_id, &field)?;

            match designer.move_field(&table_id, &field_id, direction.into())? {
                Some(event) => println!("{}", event),
                None => println!("Field {} is already at the edge", field_id),
            }
        }

        Commands::DeleteField {
            project,
            table,
            field,
        } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            let field_id = designer
                .project()
                .table(&table_id)?
                .find_field(&field)
                .map(|f| f.id.clone())
                .unwrap_or(field);

            match designer.delete_field(&table_id, &field_id)? {
                Some(event) => println!("{}", event),
                None => println!("No field {} in {}", field_id, table_id),
            }
        }

        Commands::Formula {
            project,
            table,
            field,
            tokens,
            clear,
        } => {
            let mut designer = open(&config, &project)?;
            let table_id = table_id(&designer, &table)?;
            let field_id = field_id(&designer, &table_id, &field)?;

            let current = designer.project().field(&table_id, &field_id)?;
            if !current.is_computed() {
                bail!("Field {} is not a computed field", field_id);
            }

            let mut builder = match (clear, current.formula()) {
                (false, Some(existing)) => FormulaBuilder::with_formula(existing),
                _ => FormulaBuilder::new(),
            };
            for token in &tokens {
                let (kind, literal) = token
                    .split_once(':')
                    .with_context(|| format!("Token {:?} is not kind:literal", token))?;
                builder.build_token(kind.parse::<TokenKind>()?, literal)?;
            }

            let update = FieldUpdate::new().formula(builder.formula());
            designer.update_field(&table_id, &field_id, &update)?;

            println!("{}", builder.preview());
            let refs = builder.field_tokens();
            if !refs.is_empty() {
                println!("Fields used: {}", refs.join(", "));
            }
        }

        Commands::Check { project } => {
            let designer = open(&config, &project)?;
            let issues = designer.project().validate();
            if issues.is_empty() {
                println!("No problems found");
            } else {
                for issue in &issues {
                    println!("  {}", issue);
                }
                bail!("{} problem(s) found", issues.len());
            }
        }
    }

    Ok(())
}

/// Open an existing project for editing; every change is written back
fn open(config: &DesignerConfig, name_or_path: &str) -> Result<Designer> {
    let store = ProjectStore::from_config(config)?;
    let path = store.locate(name_or_path);
    let designer = Designer::open(&path, store)
        .with_context(|| format!("Failed to open project {:?}", path))?;
    Ok(designer.with_autosave(config.autosave))
}

fn table_id(designer: &Designer, key: &str) -> Result<String> {
    designer
        .project()
        .find_table(key)
        .map(|t| t.id.clone())
        .with_context(|| format!("No table {:?} in project", key))
}

fn field_id(designer: &Designer, table_id: &str, key: &str) -> Result<String> {
    designer
        .project()
        .table(table_id)?
        .find_field(key)
        .map(|f| f.id.clone())
        .with_context(|| format!("No field {:?} in table {}", key, table_id))
}

fn print_project(project: &Project) {
    println!("{}", project.name);
    if !project.description.is_empty() {
        println!("{}", project.description);
    }
    println!("Modified: {}\n", project.modified);

    for table in &project.tables {
        print_table(table);
    }
}

fn print_table(table: &Table) {
    println!("{} {} ({}) [{}]", table.icon, table.name_ru, table.name_en, table.id);
    for field in &table.fields {
        let mut line = format!("    {:<24} {:<20} {}", field.label(), field.type_name(), field.id);
        if field.required {
            line.push_str(" required");
        }
        if let Some(target) = field.reference_target() {
            line.push_str(&format!(" -> {}", target));
        }
        if let Some(formula) = field.formula() {
            line.push_str(&format!(" = {}", formula));
        }
        println!("{}", line);
    }
    if !table.referenced_by.is_empty() {
        println!("    referenced by: {}", table.referenced_by.join(", "));
    }
    println!();
}
