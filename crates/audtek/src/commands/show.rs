//! `audtek show`: one node and its full record.

use serde_json::Value;

use audtek_core::{CatalogBrowser, CoreError};

use crate::cli::{GlobalOpts, ShowArgs};
use crate::commands::tree::kind_label;
use crate::error::CliError;
use crate::output::{self, NodeDetail, Painter};

pub async fn handle(
    args: ShowArgs,
    browser: &CatalogBrowser,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let load = async {
        let id = browser.resolve(&args.path).await?;
        let record = match browser.detail(id).await {
            Ok(record) => Value::clone(&record),
            // The root and the fixed collections have no record of their own.
            Err(CoreError::NoRecord { .. }) => Value::Null,
            Err(e) => return Err(e),
        };
        Ok((id, record))
    };

    let (id, record) = tokio::select! {
        res = load => res?,
        _ = tokio::signal::ctrl_c() => {
            browser.cancel();
            return Err(CliError::Interrupted);
        }
    };

    let node = browser.node(id)?;
    let detail = NodeDetail {
        path: browser.path_of(id)?,
        name: node.name.clone(),
        kind: kind_label(&node),
        record,
    };
    output::print_output(
        &output::render_detail(global.output, &detail, Painter::new(global.color)),
        global.quiet,
    );
    Ok(())
}
