use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use meshbridge_core::TransformState;
use meshbridge_engine::{serve, CommandEngine, GeometryEngine, LocalEngine};
use meshbridge_pipeline::{
    Command as PipelineCommand, CommandOutcome, Pipeline, PipelineConfig, SegmentationParams,
    SimplificationParams,
};
use meshbridge_scene::{Host, InMemoryScene, Material, ObjectId};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "meshbridge", version, about = "Segment and simplify meshes with a geometry engine")]
struct Cli {
    /// Pipeline configuration (JSON); missing keys use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run the geometry engine as this program instead of in-process
    #[arg(long, global = true)]
    engine_cmd: Option<String>,

    /// Argument passed to the engine program (repeatable)
    #[arg(long = "engine-arg", global = true, allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a mesh into segments and give each its own material
    Segment {
        /// Input OBJ file
        input: PathBuf,
        /// Output OBJ file (an MTL file is written next to it)
        #[arg(long, short)]
        output: PathBuf,
        /// Number of clusters (2-10)
        #[arg(long, default_value_t = 4)]
        clusters: u32,
        /// Smoothing strength (0-1)
        #[arg(long, default_value_t = 0.5)]
        smoothness: f32,
        /// Drop the mesh's existing materials first
        #[arg(long)]
        delete_existing_materials: bool,
    },
    /// Reduce the face count of a mesh
    Simplify {
        /// Input OBJ file
        input: PathBuf,
        /// Output OBJ file
        #[arg(long, short)]
        output: PathBuf,
        /// Fraction of faces to remove (0-1)
        #[arg(long, default_value_t = 0.5)]
        decimation_factor: f32,
    },
    /// Print vertex and face counts of one or more meshes
    Stats {
        /// Input OBJ files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Serve the in-process engine over stdin/stdout, one JSON request per line
    Engine,
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn build_engine(cli: &Cli) -> Box<dyn GeometryEngine> {
    match &cli.engine_cmd {
        Some(program) => {
            log::info!("Using geometry engine program {}", program);
            Box::new(CommandEngine::new(program.as_str()).args(cli.engine_args.iter().cloned()))
        }
        None => Box::new(LocalEngine::new()),
    }
}

/// Load an OBJ file as the active, selected object of `scene`
fn load_object(scene: &mut InMemoryScene, path: &Path) -> Result<ObjectId> {
    let model = meshbridge_io::read_mesh(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let object = scene.add_mesh_object(&model.name, model.mesh, TransformState::identity())?;
    scene.set_active_and_selected(object)?;
    Ok(object)
}

fn save_object(scene: &InMemoryScene, object: ObjectId, path: &Path) -> Result<()> {
    let mesh = scene.mesh(object)?;
    let materials = mesh
        .materials
        .iter()
        .map(|&handle| scene.material(handle).cloned())
        .collect::<Option<Vec<Material>>>()
        .context("Mesh refers to a material that does not exist")?;
    meshbridge_io::write_mesh(path, &scene.object_name(object)?, mesh, &materials)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn print_outcome(outcome: &CommandOutcome) -> Result<()> {
    let stdout = io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), outcome)?;
    println!();
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Segment {
            input,
            output,
            clusters,
            smoothness,
            delete_existing_materials,
        } => {
            let mut scene = InMemoryScene::new();
            let object = load_object(&mut scene, input)?;
            let params = SegmentationParams {
                clusters: *clusters,
                smoothness: *smoothness,
                delete_existing_materials: *delete_existing_materials,
            };
            let mut pipeline = Pipeline::with_config(build_engine(&cli), config);
            let outcome = pipeline
                .execute(&mut scene, PipelineCommand::Segment(params))
                .context("Segmentation failed")?;
            save_object(&scene, object, output)?;
            print_outcome(&outcome)
        }
        Command::Simplify {
            input,
            output,
            decimation_factor,
        } => {
            let mut scene = InMemoryScene::new();
            load_object(&mut scene, input)?;
            let params = SimplificationParams {
                decimation_factor: *decimation_factor,
            };
            let mut pipeline = Pipeline::with_config(build_engine(&cli), config);
            let outcome = pipeline
                .execute(&mut scene, PipelineCommand::Simplify(params))
                .context("Simplification failed")?;
            let CommandOutcome::Simplified(report) = &outcome else {
                bail!("Unexpected outcome of a simplification");
            };
            save_object(&scene, report.object, output)?;
            print_outcome(&outcome)
        }
        Command::Stats { inputs } => {
            let mut scene = InMemoryScene::new();
            for input in inputs {
                load_object(&mut scene, input)?;
            }
            let mut pipeline = Pipeline::with_config(build_engine(&cli), config);
            let outcome = pipeline.execute(&mut scene, PipelineCommand::Stats)?;
            print_outcome(&outcome)
        }
        Command::Engine => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let answered = serve(
                &mut LocalEngine::new(),
                stdin.lock(),
                BufWriter::new(stdout.lock()),
            )?;
            log::debug!("Answered {} engine requests", answered);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    run(cli)
}
