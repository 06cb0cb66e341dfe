// SPDX-FileCopyrightText: 2025 wifidb contributors
// SPDX-License-Identifier: MIT

//! Subcommand execution. Every command produces one JSON document.

use serde_json::{Value as Json, json};
use tracing::debug;
use wifidb_engine::{Bounds, CancellationToken, Engine, StoreHandle};

use crate::cli::{Args, Command};
use crate::error::{CliError, Result};

/// Run the parsed command and return its JSON output.
///
/// `cancel` aborts long bounding-box scans.
pub async fn run(engine: &Engine, args: &Args, cancel: &CancellationToken) -> Result<Json> {
    if let Command::Purge = args.command {
        let reference = args
            .reference
            .as_deref()
            .ok_or_else(|| CliError::usage("purge needs --reference"))?;
        let removed = engine.remove_cached(reference).await?;
        return Ok(json!({ "reference": reference, "removed": removed }));
    }

    let handle = open(engine, args).await?;
    let output = execute(engine, &handle, &args.command, cancel).await;
    engine.close_store(&handle).await;
    output
}

async fn open(engine: &Engine, args: &Args) -> Result<StoreHandle> {
    if args.reference.is_none() && args.direct_path.is_none() {
        return Err(CliError::usage("one of --reference or --direct-path is required"));
    }
    let reference = args.reference.as_deref();
    let direct_path = args.direct_path.as_deref();
    let handle = match &args.table {
        Some(table) => {
            engine
                .attach_custom_store(reference, direct_path, table, args.column_map())
                .await?
        }
        None => {
            if !args.columns.is_empty() {
                return Err(CliError::usage("--column only applies together with --table"));
            }
            engine.open_store(reference, direct_path).await?
        }
    };
    debug!("Opened {} for {:?}", handle.path().display(), args.command);
    Ok(handle)
}

async fn execute(
    engine: &Engine,
    handle: &StoreHandle,
    command: &Command,
    cancel: &CancellationToken,
) -> Result<Json> {
    let output = match command {
        Command::Classify => {
            let recommended = engine.recommend_index_level(handle).await?;
            json!({
                "path": handle.path(),
                "origin": handle.origin(),
                "classification": engine.classify(handle),
                "recommended": recommended,
            })
        }
        Command::Lookup { identifiers } => match identifiers.as_slice() {
            [single] => serde_json::to_value(engine.lookup(handle, single).await?)?,
            many => serde_json::to_value(engine.search_by_identifiers(handle, many).await?)?,
        },
        Command::Search {
            query,
            fields,
            whole_word,
            names,
        } => {
            let rows = if *names {
                engine.search_by_names(handle, query).await?
            } else {
                engine
                    .search_by_fields(handle, fields, &query.join(" "), *whole_word)
                    .await?
            };
            serde_json::to_value(rows)?
        }
        Command::Bbox {
            south,
            north,
            west,
            east,
            limit,
        } => {
            let bounds = Bounds::new(*south, *north, *west, *east);
            let points = engine
                .points_in_bounding_box(handle, bounds, *limit, cancel)
                .await?;
            serde_json::to_value(points)?
        }
        Command::Tables { table: None } => serde_json::to_value(engine.tables(handle).await?)?,
        Command::Tables { table: Some(table) } => {
            serde_json::to_value(engine.columns(handle, table).await?)?
        }
        Command::Purge => return Err(CliError::usage("purge does not open a store")),
    };
    Ok(output)
}
