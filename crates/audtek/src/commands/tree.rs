//! `audtek tree`: print the catalog below a path.

use futures_util::future::try_join_all;
use tracing::debug;

use audtek_core::{CatalogBrowser, CoreError, NodeId, NodeKind, VirtualPathNode};

use crate::cli::{GlobalOpts, TreeArgs};
use crate::error::CliError;
use crate::output::{self, Painter, TreeEntry};

pub async fn handle(
    args: TreeArgs,
    browser: &CatalogBrowser,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let load = async {
        let start = browser.resolve(&args.path).await?;
        expand_levels(browser, start, args.depth).await?;
        Ok::<_, CoreError>(start)
    };

    let start = tokio::select! {
        res = load => res?,
        _ = tokio::signal::ctrl_c() => {
            browser.cancel();
            return Err(CliError::Interrupted);
        }
    };

    let tree = build_entry(browser, start, args.depth)?;
    let painter = Painter::new(global.color);
    output::print_output(
        &output::render_tree(global.output, &tree, painter),
        global.quiet,
    );
    Ok(())
}

/// Expand `depth` levels below `start`, one level at a time. All nodes of a
/// level are queued together; the next level starts once they are loaded.
async fn expand_levels(
    browser: &CatalogBrowser,
    start: NodeId,
    depth: usize,
) -> Result<(), CoreError> {
    let mut frontier = vec![start];
    for level in 0..depth {
        if frontier.is_empty() {
            break;
        }
        debug!(level, nodes = frontier.len(), "expanding level");
        let pending = frontier
            .iter()
            .map(|id| browser.expand(*id))
            .collect::<Result<Vec<_>, _>>()?;
        try_join_all(pending.into_iter().map(|expansion| expansion.wait())).await?;

        let mut next = Vec::new();
        for id in &frontier {
            next.extend(
                browser
                    .children(*id)?
                    .into_iter()
                    .filter(VirtualPathNode::is_container)
                    .map(|node| node.id),
            );
        }
        frontier = next;
    }
    Ok(())
}

/// Snapshot the loaded part of the tree below `id`.
fn build_entry(browser: &CatalogBrowser, id: NodeId, depth: usize) -> Result<TreeEntry, CliError> {
    let node = browser.node(id)?;
    let children = if depth > 0 && node.is_loaded() && node.is_container() {
        let entries = node
            .children
            .iter()
            .map(|child| build_entry(browser, *child, depth - 1))
            .collect::<Result<Vec<_>, _>>()?;
        Some(entries)
    } else {
        None
    };
    Ok(TreeEntry {
        path: browser.path_of(id)?,
        name: node.name.clone(),
        kind: kind_label(&node),
        children,
    })
}

pub(crate) fn kind_label(node: &VirtualPathNode) -> String {
    match node.kind {
        NodeKind::Root => "root".into(),
        NodeKind::StaticContainer(_) => "collection".into(),
        NodeKind::DynamicItem => match node.item_kind() {
            Some(kind) => kind.to_string(),
            None => "item".into(),
        },
    }
}
