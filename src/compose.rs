//! The `graph` and `dashboard` commands.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::{DashboardArgs, GraphArgs},
    dashboard::Dashboard,
    dataset::{Dataset, DatasetOptions},
    graph::Graph,
};

pub fn execute_graph(args: &GraphArgs) -> Result<()> {
    let options = DatasetOptions::default()
        .with_date_format(args.datefmt.clone())
        .with_descriptor_format(args.format);
    let datasets = args
        .sources
        .iter()
        .map(|id| {
            Dataset::load(&args.basedir, id, options.clone())
                .with_context(|| format!("Loading datasource '{id}' from {:?}", args.basedir))
        })
        .collect::<Result<Vec<_>>>()?;
    let dataset_refs = datasets.iter().collect::<Vec<_>>();
    let metric_ids = (!args.metrics.is_empty()).then_some(args.metrics.as_slice());

    let title = args.title.clone().unwrap_or_else(|| args.id.clone());
    let mut graph = Graph::new(args.id.clone(), title, &dataset_refs, metric_ids)
        .with_context(|| format!("Building graph '{}'", args.id))?;
    if let Some(slug) = &args.slug {
        graph = graph.with_slug(slug.clone());
    }
    if graph.metrics().is_empty() {
        warn!("Graph '{}' has no metrics", graph.id);
    }
    let path = graph
        .write(&args.basedir)
        .with_context(|| format!("Writing graph '{}'", graph.id))?;
    info!(
        "Graph '{}' plots {} metric(s) from {} datasource(s) ({} warning(s)); see {:?}",
        graph.id,
        graph.metrics().len(),
        datasets.len(),
        graph.warnings().len(),
        path
    );
    Ok(())
}

pub fn execute_dashboard(args: &DashboardArgs) -> Result<()> {
    let name = args.name.clone().unwrap_or_else(|| args.id.clone());
    let mut dashboard = Dashboard::new(args.id.clone(), name)
        .with_context(|| format!("Building dashboard '{}'", args.id))?
        .with_headline(args.headline.clone())
        .with_subhead(args.subhead.clone());
    for tab in &args.tabs {
        dashboard.add_tab(tab.name.clone(), tab.graph_ids.iter().cloned());
    }
    dashboard
        .write(&args.basedir)
        .with_context(|| format!("Writing dashboard '{}'", dashboard.id))?;
    Ok(())
}
