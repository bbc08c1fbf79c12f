// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  calibration::*,
  client::*,
  event_loop::*,
  features::*,
  frame::*,
  labels::*,
  live::*,
  parameters::*,
  pipeline::*,
  render_sync::*,
  shutdown::*,
  source::*,
  targets::*,
  transport::*,
  types::*,
  util::*,
  visualize::*,
};

pub(crate) use crate::wire;

pub use {
  std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    sync::Mutex,
  },
  log::{debug, error, info, trace, warn, LevelFilter},
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
  serde::{Deserialize, Serialize},
};
