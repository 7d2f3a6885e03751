use anyhow::{Context, Result};
use carmapper_lib::*;
use clap::{Arg, ArgMatches, Command};
use serde_json::Value;
use std::fs;
use std::io::{self, Read};

fn main() -> Result<()> {
    init_logging();

    let matches = Command::new("carmapper")
        .version("0.1.0")
        .about("Bind JSON documents to car records and write them back")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Input JSON file (stdin if not specified)")
                .required(false),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (stdout if not specified)")
                .required(false),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_name("TARGET")
                .help("Record shape to bind the input to")
                .value_parser(["car", "cars", "user", "request", "tree"])
                .default_value("car"),
        )
        .arg(
            Arg::new("field")
                .short('f')
                .long("field")
                .value_name("NAME")
                .help("Print a field of the tree as text - can be specified multiple times")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON mapper configuration; flags override it"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .help("Ignore unknown properties and map null primitives to zero")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("date-format")
                .long("date-format")
                .value_name("PATTERN")
                .help("Date pattern such as \"yyyy-MM-dd HH:mm\""),
        )
        .arg(
            Arg::new("timestamps")
                .long("timestamps")
                .help("Write dates as epoch milliseconds")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .help("Indent the output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("brand-only")
                .long("brand-only")
                .help("Write cars as {\"car_brand\": <type>}")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("drop-type")
                .long("drop-type")
                .help("Read only the color of cars")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let mapper = build_mapper(&matches)?;

    let input_json = match matches.get_one::<String>("input") {
        Some(input_file) => fs::read_to_string(input_file)
            .with_context(|| format!("Failed to read {}", input_file))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let target = matches
        .get_one::<String>("target")
        .map(String::as_str)
        .unwrap_or("car");
    tracing::debug!(shape = target, "binding input");
    if target != "tree" && matches.contains_id("field") {
        tracing::warn!(shape = target, "--field only applies to the tree target, ignoring it");
    }

    let output = match target {
        "car" => mapper.write_value_as_string(&mapper.read_value::<Car>(&input_json)?)?,
        "cars" => mapper.write_values_as_string(&mapper.read_list::<Car>(&input_json)?)?,
        "user" => mapper.write_value_as_string(&mapper.read_value::<User>(&input_json)?)?,
        "request" => mapper.write_value_as_string(&mapper.read_value::<Request>(&input_json)?)?,
        _ => {
            let tree = mapper.read_tree(&input_json)?;
            render_tree(&mapper, &tree, &matches)?
        }
    };

    if let Some(output_file) = matches.get_one::<String>("output") {
        fs::write(output_file, output).with_context(|| format!("Failed to write {}", output_file))?;
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn build_mapper(matches: &ArgMatches) -> Result<ObjectMapper> {
    let mut config = match matches.get_one::<String>("config") {
        Some(config_file) => {
            let text = fs::read_to_string(config_file)
                .with_context(|| format!("Failed to read {}", config_file))?;
            serde_json::from_str::<MapperConfig>(&text)
                .with_context(|| format!("Invalid mapper configuration in {}", config_file))?
        }
        None => MapperConfig::default(),
    };

    if matches.get_flag("lenient") {
        config.set(Feature::FailOnUnknownProperties, false);
        config.set(Feature::FailOnNullForPrimitives, false);
    }
    if matches.get_flag("timestamps") {
        config.set(Feature::WriteDatesAsTimestamps, true);
    }
    if matches.get_flag("pretty") {
        config.set(Feature::IndentOutput, true);
    }
    if let Some(pattern) = matches.get_one::<String>("date-format") {
        config.date_format = Some(pattern.clone());
    }

    let mut mapper = ObjectMapper::with_config(config)?;

    if matches.get_flag("brand-only") {
        let mut module = SimpleModule::new("CarBrandSerializer", Version::new(1, 0, 0));
        module.add_serializer::<Car, _>(CarBrandSerializer);
        mapper.register_module(module);
    }
    if matches.get_flag("drop-type") {
        let mut module = SimpleModule::new("CarColorDeserializer", Version::new(1, 0, 0));
        module.add_deserializer::<Car, _>(CarColorDeserializer);
        mapper.register_module(module);
    }

    Ok(mapper)
}

fn render_tree(mapper: &ObjectMapper, tree: &Value, matches: &ArgMatches) -> Result<String> {
    let Some(fields) = matches.get_many::<String>("field") else {
        return Ok(mapper.write_tree(tree, mapper.is_enabled(Feature::IndentOutput))?);
    };

    let lines: Vec<String> = fields
        .map(|name| match tree.get_field(name) {
            Some(node) => node.as_text(),
            None => {
                tracing::warn!(field = %name, "field not present in input");
                String::new()
            }
        })
        .collect();
    Ok(lines.join("\n"))
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}
