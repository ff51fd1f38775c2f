use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Parser;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing_subscriber::EnvFilter;

use placemap::config_params::{FETCH_TIMEOUT, MIN_MAIN_MAP_HEIGHT};
use placemap::fetch::{AssetSource, FileSource, HttpSource};
use placemap::headless::HeadlessPage;
use placemap::{
    init_map, render, LatLng, MapError, MapSlot, MapSurface, PlaceConfig, PlaceCoordinates, Result,
};

#[derive(Parser, Debug)]
#[command(name = "placemap", version, about = "Render the overview and detail maps of a place")]
struct Args {
    /// Input configuration file to use (.toml).
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Directory receiving side.svg and main.svg; overrides [map].output.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct MapSection {
    output: Option<PathBuf>,
    static_root: Option<PathBuf>,
    base_url: Option<String>,
    geojson_file: Option<PathBuf>,
    /// Detail map centers the user pans to, in order.
    pan: Vec<LatLng>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct PageSection {
    side: Option<[u32; 2]>,
    main: Option<[u32; 2]>,
}

#[derive(Deserialize, Debug)]
struct CliConfig {
    #[serde(default)]
    map: MapSection,
    #[serde(default)]
    page: PageSection,
    #[serde(default)]
    place: PlaceConfig,
    /// Raw place record whose coordinates override `[place]`.
    record: Option<JsonValue>,
}

impl CliConfig {
    fn from_toml(raw: &str) -> Result<Self> {
        let mut config: CliConfig = toml::from_str(raw)?;
        if let Some(ref record) = config.record {
            let coords = PlaceCoordinates::extract(record);
            tracing::debug!(centroid = ?coords.centroid, bounds = ?coords.bounds, "place record");
            coords.apply_to(&mut config.place);
        }
        Ok(config)
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn build_page(page: &PageSection) -> HeadlessPage {
    let mut headless = HeadlessPage::new();
    if let Some([width, height]) = page.side {
        headless = headless.with_element(
            MapSlot::Side.element_id(),
            f64::from(width),
            f64::from(height),
        );
    }
    if let Some([width, height]) = page.main {
        let height = height.max(MIN_MAIN_MAP_HEIGHT);
        headless = headless.with_element(
            MapSlot::Main.element_id(),
            f64::from(width),
            f64::from(height),
        );
    }
    headless
}

async fn run(args: Args) -> Result<()> {
    let raw = fs::read_to_string(&args.input)?;
    let mut config = CliConfig::from_toml(&raw)?;
    let base = args
        .input
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    if let Some(ref geojson_file) = config.map.geojson_file {
        let raw_json = fs::read_to_string(relative_to(&base, geojson_file))?;
        config.place.geojson = Some(serde_json::from_str(&raw_json)?);
    }

    let static_root = config.map.static_root.as_deref().unwrap_or(Path::new("static"));
    let static_root = relative_to(&base, static_root);
    let http = HttpSource::new(FETCH_TIMEOUT, config.map.base_url.clone())?;
    tracing::debug!(
        static_root = %static_root.display(),
        timeout = ?http.request_timeout(),
        "dataset sources"
    );
    let source = AssetSource::new(FileSource::new(static_root), http);

    let mut page = build_page(&config.page);
    let place = Rc::new(config.place);
    let pair = match init_map(place, &mut page, &source).await {
        Some(pair) => pair,
        None => {
            tracing::info!("no map elements in [page], nothing to render");
            return Ok(());
        }
    };

    if let Some(main) = pair.map(MapSlot::Main) {
        for center in &config.map.pan {
            if let Err(err) = main.borrow_mut().pan_to(*center) {
                tracing::warn!(%center, error = %err, "cannot pan detail map");
            }
        }
    }

    let output = args
        .output
        .or_else(|| config.map.output.as_ref().map(|out| relative_to(&base, out)))
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output)?;

    for slot in [MapSlot::Side, MapSlot::Main] {
        let map = match pair.map(slot) {
            Some(map) => map.borrow(),
            None => continue,
        };
        match (map.center(), map.zoom()) {
            (Some(center), Some(zoom)) => {
                tracing::info!(map = %slot, state = ?pair.state(slot), %center, zoom, "view")
            }
            _ => tracing::info!(map = %slot, state = ?pair.state(slot), "default view"),
        }
        let path = output.join(format!("{}.svg", slot.key()));
        render::save(&map, &path)?;
        println!("{}", path.display());
    }

    for incident in pair.incidents().snapshot() {
        println!("warning: {}", incident);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        let hint = match err {
            MapError::Io(_) => "check the configuration and layer paths",
            MapError::Toml(_) | MapError::Json(_) => "check the configuration syntax",
            _ => "see the log above",
        };
        println!("Unable to render maps: {} ({})", err, hint);
        std::process::exit(1);
    }
}
