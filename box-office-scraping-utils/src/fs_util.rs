use std::{fmt::Debug, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}

/// Like [`read_toml`], but a missing file yields `T::default()`.
pub fn read_toml_or_default<P: Into<PathBuf> + Debug, T: Default + for<'de> Deserialize<'de>>(
    path: Option<P>,
) -> anyhow::Result<T> {
    match path {
        Some(path) => read_toml(path),
        None => Ok(T::default()),
    }
}
