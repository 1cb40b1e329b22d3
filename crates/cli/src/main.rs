mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use oasis_lib::component::RegenerateOptions;
use oasis_lib::settings::Settings;
use oasis_lib::templates::Template;

use crate::output::print_error;

/// oasis - Scaffold, build and regenerate pipeline components
#[derive(Parser)]
#[command(name = "oasis")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create, build and push container roots
  #[command(subcommand)]
  Containers(ContainersCommand),

  /// Create and regenerate components
  #[command(subcommand)]
  Components(ComponentsCommand),
}

#[derive(Subcommand)]
enum ContainersCommand {
  /// Create a container root from a template
  #[command(subcommand)]
  New(ContainerTemplate),

  /// Build the container root image and push it
  ///
  /// The image name comes from --repository/--tag or from the directory's
  /// oasis.pipeline_component_root.yaml. The pushed image digest is recorded
  /// back into that file.
  Build {
    /// Image repository, e.g. ghcr.io/org/components
    #[arg(long)]
    repository: Option<String>,

    /// Image tag
    #[arg(long)]
    tag: Option<String>,

    /// Container root directory (build context)
    #[arg(long, default_value = ".")]
    directory: PathBuf,

    /// Target platform (default: OASIS_BUILD_PLATFORM or linux/amd64)
    #[arg(long)]
    platform: Option<String>,
  },
}

#[derive(Subcommand)]
enum ContainerTemplate {
  /// Python container root managed with uv
  PythonUvContainerRoot(ContainerRootArgs),

  /// Container root with a plain Dockerfile
  GenericContainerRoot(ContainerRootArgs),
}

#[derive(Args)]
struct ContainerRootArgs {
  /// Image name recorded for later builds, e.g. ghcr.io/org/components
  #[arg(long)]
  container_image_name: String,

  #[command(flatten)]
  target: TemplateTarget,
}

#[derive(Args)]
struct TemplateTarget {
  /// Directory to create the files in
  #[arg(long, default_value = ".")]
  directory: PathBuf,

  /// Overwrite existing files
  #[arg(long)]
  force: bool,
}

#[derive(Subcommand)]
enum ComponentsCommand {
  /// Create a component from a template
  #[command(subcommand)]
  New(ComponentTemplate),

  /// Regenerate a component's spec from its source
  #[command(subcommand)]
  Regenerate(RegenerateTarget),
}

#[derive(Subcommand)]
enum ComponentTemplate {
  /// Component implemented by a Python function
  PythonFunctionComponent(TemplateTarget),

  /// Component implemented by a shell script
  ShellScriptComponent(TemplateTarget),
}

#[derive(Subcommand)]
enum RegenerateTarget {
  /// Generate component.yaml from a Python function
  PythonFunctionComponent(RegenerateArgs),
}

#[derive(Args)]
struct RegenerateArgs {
  /// Base container image, e.g. python:3.12
  #[arg(long)]
  container_image: Option<String>,

  /// YAML file with a `container_image_name` key
  #[arg(long)]
  container_image_from: Option<PathBuf>,

  /// Python module holding the component function
  #[arg(long, default_value = "component.py")]
  module_path: PathBuf,

  /// Function to use (default: the module's only public function)
  #[arg(long)]
  function_name: Option<String>,

  /// pyproject.toml to take dependencies from (default: <directory>/pyproject.toml if present)
  #[arg(long)]
  dependencies_from: Option<PathBuf>,

  /// Component directory; other paths are relative to it
  #[arg(long, default_value = ".")]
  directory: PathBuf,

  /// Where to write the component spec
  #[arg(long, default_value = "component.yaml")]
  output_component_yaml_path: PathBuf,
}

fn init_tracing(verbose: bool) {
  let default_directives = if verbose {
    "warn,oasis=debug,oasis_lib=debug"
  } else {
    "warn"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let settings = Settings::from_env();

  let result = match cli.command {
    Commands::Containers(ContainersCommand::New(template)) => match template {
      ContainerTemplate::PythonUvContainerRoot(args) => cmd::cmd_containers_new(
        Template::PythonUvContainerRoot,
        &args.container_image_name,
        &args.target.directory,
        args.target.force,
      ),
      ContainerTemplate::GenericContainerRoot(args) => cmd::cmd_containers_new(
        Template::GenericContainerRoot,
        &args.container_image_name,
        &args.target.directory,
        args.target.force,
      ),
    },
    Commands::Containers(ContainersCommand::Build {
      repository,
      tag,
      directory,
      platform,
    }) => cmd::cmd_containers_build(&settings, repository, tag, directory, platform),
    Commands::Components(ComponentsCommand::New(template)) => match template {
      ComponentTemplate::PythonFunctionComponent(target) => {
        cmd::cmd_components_new(Template::PythonFunctionComponent, &target.directory, target.force)
      }
      ComponentTemplate::ShellScriptComponent(target) => {
        cmd::cmd_components_new(Template::ShellScriptComponent, &target.directory, target.force)
      }
    },
    Commands::Components(ComponentsCommand::Regenerate(RegenerateTarget::PythonFunctionComponent(args))) => {
      cmd::cmd_components_regenerate(
        &settings,
        &RegenerateOptions {
          container_image: args.container_image,
          container_image_from: args.container_image_from,
          module_path: args.module_path,
          function_name: args.function_name,
          dependencies_from: args.dependencies_from,
          directory: args.directory,
          output_component_yaml_path: args.output_component_yaml_path,
        },
      )
    }
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
