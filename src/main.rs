use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};

use log::{error, info};
use serde::Deserialize;
use structured_logger::json::new_writer;
use structured_logger::Builder;
use thiserror::Error;

use osm_xml_stream::{parse_file, Element, OsmData};

const DEFAULT_CONFIG_PATH: &str = "config/osm_dump.json";

#[derive(Debug, Error)]
enum DumpError {
    #[error("could not read config: {0}")]
    ConfigIo(#[source] io::Error),

    #[error("could not parse config: {0}")]
    Config(#[source] serde_json::Error),

    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not write output: {0}")]
    Output(#[from] io::Error),

    #[error(transparent)]
    Parse(#[from] osm_xml_stream::Error),
}

type Result<T> = std::result::Result<T, DumpError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Log record counts once the file is read.
    #[default]
    Summary,
    /// One JSON object per record on stdout.
    Json,
}

#[derive(Debug, Deserialize)]
pub struct UserConfig {
    pub data_path: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub output: OutputMode,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_chunk_size() -> usize {
    osm_xml_stream::DEFAULT_CHUNK_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

fn load_user_config(path: &str) -> Result<UserConfig> {
    let file = File::open(path).map_err(DumpError::ConfigIo)?;
    serde_json::from_reader(file).map_err(DumpError::Config)
}

// stdout carries the records, so logs go to stderr.
fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    metadata: usize,
    nodes: usize,
    tagged_nodes: usize,
    ways: usize,
    faulty_ways: usize,
    closed_ways: usize,
    relations: usize,
}

impl Summary {
    fn add(&mut self, record: &OsmData) {
        match record {
            OsmData::Metadata(_) => self.metadata += 1,
            OsmData::Node(node) => {
                self.nodes += 1;
                if !node.tags().is_empty() {
                    self.tagged_nodes += 1;
                }
            }
            OsmData::Way(way) => {
                self.ways += 1;
                if way.is_faulty() {
                    self.faulty_ways += 1;
                }
                if way.is_closed() {
                    self.closed_ways += 1;
                }
            }
            OsmData::Relation(_) => self.relations += 1,
        }
    }

    fn log(&self) {
        info!(
            metadata = self.metadata,
            nodes = self.nodes,
            tagged_nodes = self.tagged_nodes,
            ways = self.ways,
            faulty_ways = self.faulty_ways,
            closed_ways = self.closed_ways,
            relations = self.relations;
            "Finished reading OSM data"
        );
    }
}

fn dump(config: &UserConfig) -> Result<Summary> {
    let records = parse_file(&config.data_path, config.chunk_size)?;
    let mut summary = Summary::default();
    let mut out = BufWriter::new(io::stdout().lock());

    for record in records {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                // records written so far stay written
                out.flush()?;
                return Err(err.into());
            }
        };
        if config.output == OutputMode::Json {
            serde_json::to_writer(&mut out, &record)?;
            out.write_all(b"\n")?;
        }
        summary.add(&record);
    }
    out.flush()?;
    Ok(summary)
}

fn main() -> Result<()> {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_user_config(&config_path)?;
    setup_logging(&config.log_level);

    info!(data_path = config.data_path.as_str(), chunk_size = config.chunk_size; "Reading OSM data");
    match dump(&config) {
        Ok(summary) => {
            summary.log();
            Ok(())
        }
        Err(err) => {
            error!(data_path = config.data_path.as_str(), err = err.to_string().as_str(); "Reading OSM data failed with error");
            Err(err)
        }
    }
}
