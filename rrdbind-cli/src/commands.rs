//! Subcommand implementations over any [`Library`].

use std::error::Error;

use rrdbind::info::InfoNode;
use rrdbind::{Client, Creator, Exporter, Grapher, Info, InfoValue, Library, TimeMatrix};

use crate::{Cli, Commands, OutputFormat, now, parse_time};

type CmdResult = Result<(), Box<dyn Error>>;

/// Runs the parsed command line against `lib`.
pub(crate) fn run<L: Library>(lib: L, cli: Cli) -> CmdResult {
    let mut client = Client::new(lib);
    if let Some(daemon) = cli.daemon.as_deref().filter(|d| !d.is_empty()) {
        client = client.with_daemon(daemon)?;
    }
    let now = now();

    match cli.command {
        Commands::Create {
            file,
            step,
            start,
            overwrite,
            definitions,
        } => cmd_create(&client, &file, step, parse_time(&start, now)?, overwrite, &definitions),
        Commands::Update {
            file,
            template,
            local,
            values,
        } => {
            if local {
                client.update_local(&file, template.as_deref(), &values)?;
            } else {
                client.update(&file, template.as_deref(), &values)?;
            }
            Ok(())
        }
        Commands::Info {
            file,
            local,
            format,
        } => {
            let info = if local {
                client.info_local(&file)?
            } else {
                client.info(&file)?
            };
            print_info(&info, format)
        }
        Commands::Fetch {
            file,
            cf,
            start,
            end,
            step,
            local,
            format,
        } => {
            let (start, end) = (parse_time(&start, now)?, parse_time(&end, now)?);
            let result = if local {
                client.fetch_local(&file, &cf, start, end, step)?
            } else {
                client.fetch(&file, &cf, start, end, step)?
            };
            print_matrix(&result.data, format)
        }
        Commands::Flush { file } => Ok(client.flush(&file)?),
        Commands::Xport {
            start,
            end,
            step,
            max_rows,
            format,
            items,
        } => {
            let mut exporter = Exporter::new();
            if let Some(rows) = max_rows {
                exporter.max_rows(rows);
            }
            for item in items {
                exporter.item(item);
            }
            let result = exporter.xport(
                &client,
                parse_time(&start, now)?,
                parse_time(&end, now)?,
                step,
            )?;
            print_matrix(&result, format)
        }
        Commands::Graph {
            output,
            start,
            end,
            title,
            width,
            height,
            items,
        } => {
            let mut grapher = Grapher::new();
            grapher.size(width, height);
            if let Some(title) = title.as_deref() {
                grapher.title(title);
            }
            for item in items {
                grapher.item(item);
            }
            let graph = grapher.save_graph(
                &client,
                &output,
                parse_time(&start, now)?,
                parse_time(&end, now)?,
            )?;
            println!("{}x{}", graph.width, graph.height);
            for line in &graph.print {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Implements `rrdbind create`.
fn cmd_create<L: Library>(
    client: &Client<L>,
    file: &str,
    step: u64,
    start: i64,
    overwrite: bool,
    definitions: &[String],
) -> CmdResult {
    let mut creator = Creator::new(file, start, step);
    for definition in definitions {
        if !(definition.starts_with("DS:") || definition.starts_with("RRA:")) {
            return Err(format!("expected DS:... or RRA:..., got '{definition}'").into());
        }
        creator.definition(definition);
    }
    Ok(creator.create(client, overwrite)?)
}

fn print_info(info: &Info, format: OutputFormat) -> CmdResult {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&info.to_json())?);
        }
        OutputFormat::Csv => {
            println!("key,value");
            for (name, node) in info.iter() {
                match node {
                    InfoNode::Scalar(value) => println!("{name},{}", display_value(value)),
                    InfoNode::List(items) => {
                        for (i, value) in items.iter().enumerate() {
                            if let Some(value) = value {
                                println!("{name}[{i}],{}", display_value(value));
                            }
                        }
                    }
                    InfoNode::Map(entries) => {
                        for (key, value) in entries {
                            println!("{name}[{key}],{}", display_value(value));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

fn display_value(value: &InfoValue) -> String {
    match value {
        InfoValue::Value(v) => v.to_string(),
        InfoValue::Count(c) => c.to_string(),
        InfoValue::Int(i) => i.to_string(),
        InfoValue::String(s) => s.clone(),
        InfoValue::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

fn print_matrix(matrix: &TimeMatrix, format: OutputFormat) -> CmdResult {
    match format {
        OutputFormat::Csv => {
            println!(
                "# start={}, end={}, step={}, rows={}",
                matrix.window.start, matrix.window.end, matrix.window.step, matrix.row_count
            );
            println!("timestamp,{}", matrix.columns.join(","));
            for (ts, row) in matrix.rows() {
                let values: Vec<String> = row.iter().map(f64::to_string).collect();
                println!("{ts},{}", values.join(","));
            }
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = matrix
                .rows()
                .map(|(ts, row)| {
                    serde_json::json!({
                        "timestamp": ts,
                        "values": row,
                    })
                })
                .collect();

            let output = serde_json::json!({
                "start": matrix.window.start,
                "end": matrix.window.end,
                "step": matrix.window.step,
                "columns": matrix.columns,
                "rows": rows,
            });

            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
