use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::sync::Arc;

use microflow::samples::{
    self, Holiday, HolidayService, HolidayViewModel, Stepper, StepperService,
};
use microflow::workflows::{install_registry, WorkflowEngine, WorkflowRegistry};
use microflow::{config, init_telemetry, InMemoryStore, StaticActor};

#[derive(Parser)]
#[command(name = "microflow")]
#[command(about = "Inspect and exercise trigger-based workflows")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the states, triggers and transitions of registered workflows
    Describe {
        /// Only describe this workflow type
        workflow_type: Option<String>,
    },
    /// List workflow definitions (title, description, route)
    Definitions,
    /// Run a sample workflow end to end against an in-memory store
    Demo {
        #[arg(value_enum)]
        workflow: DemoWorkflow,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DemoWorkflow {
    Holiday,
    Stepper,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config()?;
    init_telemetry(&config.observability)?;

    let registry = install_registry(samples::default_registry()?)?;
    let engine = WorkflowEngine::new(Arc::clone(&registry))
        .with_log_rejections(config.engine.log_rejections);

    match cli.command {
        Commands::Describe { workflow_type } => {
            describe_command(&registry, workflow_type.as_deref())
        }
        Commands::Definitions => print_json(&registry.definitions(&config.definition_creator())),
        Commands::Demo { workflow } => tokio::runtime::Runtime::new()?.block_on(async {
            match workflow {
                DemoWorkflow::Holiday => holiday_demo(engine).await,
                DemoWorkflow::Stepper => stepper_demo(engine).await,
            }
        }),
    }
}

fn describe_command(registry: &WorkflowRegistry, workflow_type: Option<&str>) -> Result<()> {
    match workflow_type {
        Some(t) => print_json(&registry.resolve(t)?.describe()),
        None => {
            let descriptions: Vec<_> = registry
                .workflow_types()
                .into_iter()
                .map(|t| registry.resolve(t).map(|m| m.describe()))
                .collect::<Result<_, _>>()?;
            print_json(&descriptions)
        }
    }
}

async fn holiday_demo(engine: WorkflowEngine) -> Result<()> {
    let store = Arc::new(InMemoryStore::<Holiday>::new());
    let requestor =
        HolidayService::new(Arc::clone(&store), engine.clone(), StaticActor::new("alice"));
    let superior = HolidayService::new(Arc::clone(&store), engine, StaticActor::new("bob"));

    let created = requestor.create().await?;
    print_json(&created)?;

    let mut application = created.view_model;
    application.superior = Some("bob".to_string());
    application.from = NaiveDate::from_ymd_opt(2026, 7, 1);
    application.to = NaiveDate::from_ymd_opt(2026, 7, 14);
    print_json(&requestor.apply(&application).await?)?;

    println!("Work for bob: {} holiday(s)", superior.my_work().await?.len());

    let approval = HolidayViewModel {
        id: application.id,
        ..HolidayViewModel::default()
    };
    print_json(&superior.approve(&approval).await?)?;

    // Approved is terminal; a second application is rejected.
    print_json(&requestor.apply(&application).await?)
}

async fn stepper_demo(engine: WorkflowEngine) -> Result<()> {
    let service = StepperService::new(
        InMemoryStore::<Stepper>::new(),
        engine,
        StaticActor::new("alice"),
    );

    let created = service.create("demo").await?;
    let id = created.view_model.id.context("Store did not assign an id")?;
    print_json(&created)?;

    for trigger in ["goto1", "goto2", "goto1", "goto2", "goto3", "finish"] {
        print_json(&service.trigger(id, trigger).await?)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
