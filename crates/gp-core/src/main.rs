use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use gp_core::prelude::*;
use gp_core::RoleOutcome;
use gp_task::{ApplyMode, PathUpdate};
use std::io::Read as _;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

/// Reads each role's response from standard input, ending at a line with a single `.`
struct StdinDialogue {
    lines: tokio::sync::Mutex<Lines<BufReader<Stdin>>>,
}

impl StdinDialogue {
    fn new() -> Self {
        Self {
            lines: tokio::sync::Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }
}

#[async_trait::async_trait]
impl DialogueEngine for StdinDialogue {
    async fn respond(&self, request: &DialogueRequest) -> Result<String, CoreError> {
        eprintln!("===== {} =====\n{}\n", request.role, request.system);
        eprintln!("Response for {} (end with a line containing '.'):", request.role);
        let mut lines = self.lines.lock().await;
        let mut response = String::new();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CoreError::Dialogue(e.to_string()))?
        {
            if line.trim() == "." {
                break;
            }
            response.push_str(&line);
            response.push('\n');
        }
        if response.is_empty() {
            return Err(CoreError::Dialogue("empty response".into()));
        }
        Ok(response)
    }
}

fn load_tasks(path: &Path) -> Result<TaskTree> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let spec: TaskSpec = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&text)?,
        _ => serde_json::from_str(&text)?,
    };
    Ok(TaskTree::new(spec)?)
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn cli() -> Command {
    Command::new("groupplan")
        .version(gp_core::VERSION)
        .about("Group planning workflow engine")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("manifest")
                .about("Print the capability manifest or a role's system message")
                .arg(
                    Arg::new("workflow")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Initial state definition (JSON or YAML)"),
                )
                .arg(
                    Arg::new("role")
                        .long("role")
                        .help("Render the full system message for this role"),
                ),
        )
        .subcommand(
            Command::new("extract")
                .about("Extract and parse the invocation in a response")
                .arg(
                    Arg::new("input")
                        .value_parser(value_parser!(PathBuf))
                        .help("Response file; reads standard input when omitted"),
                )
                .arg(
                    Arg::new("fenced")
                        .long("fenced")
                        .action(ArgAction::SetTrue)
                        .help("Read calls from the last fenced block instead of the markers"),
                ),
        )
        .subcommand(
            Command::new("mutate")
                .about("Apply path updates to a task tree")
                .arg(
                    Arg::new("tasks")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Task tree definition (JSON or YAML)"),
                )
                .arg(
                    Arg::new("updates")
                        .required(true)
                        .num_args(1..)
                        .help("Updates such as 'Task2.goal = New goal'"),
                )
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Stop at the first failing update"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the resulting tree as JSON"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run a planning session, answering each role from standard input")
                .arg(
                    Arg::new("workflow")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Initial state definition (JSON or YAML)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Session configuration (JSON)"),
                )
                .arg(
                    Arg::new("tasks")
                        .long("tasks")
                        .value_parser(value_parser!(PathBuf))
                        .help("Task tree definition (JSON or YAML)"),
                )
                .arg(
                    Arg::new("request")
                        .long("request")
                        .default_value("")
                        .help("The user's request"),
                )
                .arg(
                    Arg::new("max-rounds")
                        .long("max-rounds")
                        .value_parser(value_parser!(usize))
                        .help("Override the configured round limit"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("manifest", args)) => {
            let Some(path) = args.get_one::<PathBuf>("workflow") else {
                bail!("missing workflow file");
            };
            let graph = WorkflowGraph::new(StateRecord::load(path)?);
            let builder = ManifestBuilder::default();
            match args.get_one::<String>("role") {
                Some(role) => println!("{}", builder.system_message(role, &graph)?),
                None => println!("{}", builder.manifest()),
            }
        }
        Some(("extract", args)) => {
            let text = read_input(args.get_one::<PathBuf>("input"))?;
            let raw: Vec<&str> = if args.get_flag("fenced") {
                InvocationExtractor::extract_fenced(&text)
            } else {
                InvocationExtractor::default().extract(&text).into_iter().collect()
            };
            if raw.is_empty() {
                bail!("no invocation found");
            }
            for call in raw {
                let invocation = Invocation::parse(call)?;
                println!("{}", serde_json::to_string_pretty(&invocation)?);
            }
        }
        Some(("mutate", args)) => {
            let Some(path) = args.get_one::<PathBuf>("tasks") else {
                bail!("missing task file");
            };
            let mut tree = load_tasks(path)?;
            let mode = if args.get_flag("strict") {
                ApplyMode::Strict
            } else {
                ApplyMode::BestEffort
            };
            let updates = args
                .get_many::<String>("updates")
                .into_iter()
                .flatten()
                .filter_map(|u| u.parse::<PathUpdate>().ok());
            let report = PathMutationEngine::new(mode).apply(&mut tree, updates)?;
            for (path, error) in report.failures() {
                eprintln!("failed: {path}: {error}");
            }
            for (path, reason) in report.skipped() {
                eprintln!("skipped: {path}: {reason:?}");
            }
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&tree.to_spec()?)?);
            } else {
                println!("{tree}");
            }
        }
        Some(("run", args)) => {
            let Some(path) = args.get_one::<PathBuf>("workflow") else {
                bail!("missing workflow file");
            };
            let graph = WorkflowGraph::new(StateRecord::load(path)?);
            let mut config = match args.get_one::<PathBuf>("config") {
                Some(path) => SessionConfig::load(path)?,
                None => SessionConfig::default(),
            };
            if let Some(rounds) = args.get_one::<usize>("max-rounds") {
                config.max_rounds = *rounds;
            }
            let tree = match args.get_one::<PathBuf>("tasks") {
                Some(path) => load_tasks(path)?,
                None => TaskTree::new(TaskSpec::new("Fullfill_Request", "Fulfill the user's request"))?,
            };
            let request = args.get_one::<String>("request").cloned().unwrap_or_default();

            let mut session = PlanningSession::new(PlanningState::new(graph, tree), config, StdinDialogue::new())
                .with_user_request(request);
            let reports = session.run().await?;
            for report in &reports {
                println!("[{}] {} commands applied", report.state, report.applied());
                for result in &report.roles {
                    if let RoleOutcome::Failed { invocation, error } = &result.outcome {
                        println!("  {}: {} -> {}", result.role, invocation, error);
                    }
                }
            }
            session.log().verify_integrity()?;
            println!("Final state: {}", session.graph().current_state());
            println!("{}", session.tree());
        }
        _ => unreachable!("subcommand_required is set"),
    }
    Ok(())
}
