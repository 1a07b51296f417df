use clap::{Parser, Subcommand};
use cli::{AnnokitError, Project, Workspace, outline_mask_file, parse_point};
use color_eyre::eyre::{Result, eyre};
use dataset_export::{ExportConfig, ExportFormat, Exporter, render_preview};
use annokit_common::{ImageSize, Point};
use annotation_store::SharedAnnotationStore;
use mask::Pipeline;
use sam::{OracleSession, ProcessOracle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project file (.toml or .json)
    #[arg(short, long, global = true, default_value = "annokit.toml")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the images in the project folder and how many are annotated
    Scan,
    /// Print the class list, merged with labels found in the annotations
    Classes {
        /// Add a class to the project file
        #[arg(long)]
        add: Option<String>,
    },
    /// Build a training archive
    Export {
        /// Where to write the zip archive
        #[arg(short, long)]
        output: PathBuf,
        /// Override the configured export format
        #[arg(long)]
        format: Option<ExportFormat>,
        /// Override the configured split seed
        #[arg(long)]
        seed: Option<u64>,
        /// Staging directory (a temporary one is used when absent)
        #[arg(long)]
        staging_dir: Option<PathBuf>,
        /// Write the export report as JSON next to the archive
        #[arg(long)]
        report: bool,
    },
    /// Render one image the way the export will see it
    Preview {
        /// Image id relative to the project folder
        image: String,
        /// PNG output path
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the overlay as SVG
        #[arg(long)]
        svg: Option<PathBuf>,
        #[arg(long)]
        format: Option<ExportFormat>,
    },
    /// Outline a mask image as a polygon and print it as JSON
    Polygon {
        /// Mask image; pixels brighter than the threshold are foreground
        mask: PathBuf,
        #[arg(long, default_value = "127")]
        threshold: u8,
        #[arg(long, default_value = "2.0")]
        tolerance: f64,
        /// Rescale to an original image of WIDTHxHEIGHT
        #[arg(long, value_parser = parse_size)]
        original_size: Option<ImageSize>,
    },
    /// Segment an image from point prompts and store the polygon
    Segment {
        /// Image id relative to the project folder
        image: String,
        /// Foreground click as X,Y in original pixels (repeatable)
        #[arg(long = "point", required = true, value_parser = parse_point)]
        points: Vec<Point>,
        /// Label for the new polygon; the active class when absent
        #[arg(long)]
        label: Option<String>,
    },
    /// Print the JSON schema of the project file
    Schema,
}

fn parse_size(raw: &str) -> std::result::Result<ImageSize, String> {
    let (w, h) = raw
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width = w.parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height = h.parse().map_err(|_| format!("invalid height '{h}'"))?;
    Ok(ImageSize::new(width, height))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Scan => scan(&cli.project)?,
        Commands::Classes { add } => classes(&cli.project, add.as_deref())?,
        Commands::Export {
            output,
            format,
            seed,
            staging_dir,
            report,
        } => {
            export(
                &cli.project,
                output,
                *format,
                *seed,
                staging_dir.as_deref(),
                *report,
            )?;
        }
        Commands::Preview {
            image,
            output,
            svg,
            format,
        } => preview(&cli.project, image, output, svg.as_deref(), *format)?,
        Commands::Polygon {
            mask,
            threshold,
            tolerance,
            original_size,
        } => {
            let outline = outline_mask_file(mask, *threshold, *tolerance, *original_size)?;
            if !outline.is_valid() {
                warn!("No contour large enough was found in {:?}", mask);
            }
            println!("{}", serde_json::to_string_pretty(&outline.polygon)?);
        }
        Commands::Segment {
            image,
            points,
            label,
        } => segment(&cli.project, image, points, label.as_deref()).await?,
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&Project::schema())?);
        }
    }

    Ok(())
}

fn scan(project_path: &Path) -> Result<()> {
    let project = Project::from_file(project_path)?;
    let workspace = Workspace::open(&project)?;
    let images = workspace.source.scan()?;

    let mut annotated = 0;
    for id in &images {
        let count = workspace.store.get(id).map(|r| r.len()).unwrap_or(0);
        if count > 0 {
            annotated += 1;
        }
        println!("{id}\t{count}");
    }
    info!("{} images, {} annotated", images.len(), annotated);
    Ok(())
}

fn classes(project_path: &Path, add: Option<&str>) -> Result<()> {
    let mut project = Project::from_file(project_path)?;
    let mut workspace = Workspace::open(&project)?;

    if let Some(name) = add {
        if workspace.catalog.add(name).is_none() {
            return Err(eyre!("Class name must not be blank"));
        }
        project.export.class_list = workspace.catalog.classes().names().to_vec();
        match project_path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => std::fs::write(project_path, serde_json::to_string_pretty(&project)?)?,
            _ => project.to_toml_file(project_path)?,
        }
        info!("Added class '{}'", name.trim());
    }

    for (id, name) in workspace.catalog.classes().iter().enumerate() {
        let [r, g, b] = workspace.catalog.classes().color_for(name);
        println!("{id}\t{name}\t#{r:02x}{g:02x}{b:02x}");
    }
    Ok(())
}

fn export_config(project: &Project, workspace: &Workspace, format: Option<ExportFormat>) -> ExportConfig {
    let mut config = project.export.clone();
    if let Some(format) = format {
        config.format = format;
    }
    if config.class_list.is_empty() {
        config.class_list = workspace.catalog.classes().names().to_vec();
    }
    config
}

fn export(
    project_path: &Path,
    output: &Path,
    format: Option<ExportFormat>,
    seed: Option<u64>,
    staging_dir: Option<&Path>,
    write_report: bool,
) -> Result<()> {
    let project = Project::from_file(project_path)?;
    let workspace = Workspace::open(&project)?;
    let mut config = export_config(&project, &workspace, format);
    if seed.is_some() {
        config.seed = seed;
    }

    // The temporary staging dir lives until the end of this function.
    let temp_staging = tempfile::TempDir::new()?;
    let staging = staging_dir.unwrap_or_else(|| temp_staging.path());

    info!("📦 Exporting {} dataset from {:?}", config.format, project.images_dir);
    let outcome = Exporter::new(staging).export(workspace.store.records(), workspace.source.root(), &config)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &outcome.archive)?;
    if write_report {
        let report_path = output.with_extension("report.json");
        std::fs::write(&report_path, serde_json::to_string_pretty(&outcome.report)?)?;
        info!("📄 Report saved to: {:?}", report_path);
    }

    info!(
        "✅ Wrote {} images ({} bytes) to {:?}",
        outcome.report.exported_images(),
        outcome.archive.len(),
        output
    );
    Ok(())
}

fn preview(
    project_path: &Path,
    image_id: &str,
    output: &Path,
    svg: Option<&Path>,
    format: Option<ExportFormat>,
) -> Result<()> {
    let project = Project::from_file(project_path)?;
    let workspace = Workspace::open(&project)?;
    let config = export_config(&project, &workspace, format);
    let source = workspace.image_path(image_id)?;
    let record = workspace.store.get(image_id).cloned().unwrap_or_default();

    let (canvas, overlay) = render_preview(&source, &record, &config)?;
    canvas.save_with_format(output, image::ImageFormat::Png)?;
    if let Some(svg_path) = svg {
        std::fs::write(svg_path, overlay.to_svg())?;
    }

    info!("🖼️  Preview of '{}' ({} annotations) saved to {:?}", image_id, record.len(), output);
    Ok(())
}

async fn segment(
    project_path: &Path,
    image_id: &str,
    points: &[Point],
    label: Option<&str>,
) -> Result<()> {
    let project = Project::from_file(project_path)?;
    let oracle_config = project.oracle.clone().ok_or(AnnokitError::MissingOracle)?;
    let mut workspace = Workspace::open(&project)?;
    let image_path = workspace.image_path(image_id)?;

    let label = label
        .map(str::to_string)
        .or_else(|| workspace.catalog.active().map(str::to_string))
        .unwrap_or_else(|| annotation_store::DEFAULT_CLASS.to_string());

    let original = match workspace.store.get(image_id).map(|r| r.original_size) {
        Some(size) if !size.is_unset() => size,
        _ => {
            let (width, height) = image::image_dimensions(&image_path)?;
            workspace.store.set_original_size(image_id, width, height);
            ImageSize::new(width, height)
        }
    };

    let store = SharedAnnotationStore::new(std::mem::take(&mut workspace.store));
    let session = OracleSession::new(ProcessOracle::new(
        &oracle_config.script,
        oracle_config.uv_env_path.clone(),
    ));
    let pipeline = Pipeline::builder()
        .with_threshold(oracle_config.threshold)
        .with_simplification(oracle_config.tolerance)
        .build();

    let guard = store.begin_processing(image_id)?;
    info!("🎯 Embedding {}", image_id);
    session.embed(image_id, image_path, original).await?;
    let segment = session.segment(image_id, points, &label, &pipeline).await?;

    match segment {
        Some(segment) => {
            info!("Added '{}' polygon with {} vertices", label, segment.polygon.len());
            guard.commit(|image| image.add_segment(segment))?;
        }
        None => warn!("No polygon produced for {}", image_id),
    }
    drop(guard);

    workspace.store = store
        .into_inner()
        .ok_or_else(|| eyre!("Annotation store is still shared"))?;
    workspace.save()?;
    Ok(())
}
