use std::{
    io::Write,
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{error::Result, io_utils, metadata};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tab {
    pub name: String,
    pub graph_ids: Vec<String>,
}

/// Named tabs of graph ids. Graph ids are not checked against graphs on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dashboard {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub headline: String,
    pub subhead: String,
    pub tabs: Vec<Tab>,
}

impl Dashboard {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let id = id.into();
        metadata::validate_id("dashboard", &id)?;
        Ok(Self {
            id,
            name: name.into(),
            headline: String::new(),
            subhead: String::new(),
            tabs: Vec::new(),
        })
    }

    pub fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = headline.into();
        self
    }

    pub fn with_subhead(mut self, subhead: impl Into<String>) -> Self {
        self.subhead = subhead.into();
        self
    }

    pub fn add_tab<I, S>(&mut self, name: impl Into<String>, graph_ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tabs.push(Tab {
            name: name.into(),
            graph_ids: graph_ids.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn path(&self, root: &Path) -> PathBuf {
        root.join("dashboards").join(format!("{}.json", self.id))
    }

    /// Writes `{root}/dashboards/{id}.json`.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        metadata::validate_id("dashboard", &self.id)?;
        let rendered = self.to_json_string()?;
        let path = self.path(root);
        io_utils::write_atomic(&path, |writer| writer.write_all(rendered.as_bytes()))?;
        info!(
            "Wrote dashboard '{}' with {} tab(s) to {:?}",
            self.id,
            self.tabs.len(),
            path
        );
        Ok(path)
    }
}
