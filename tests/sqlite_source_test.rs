//! SQLite edge source integration tests

#![cfg(feature = "service")]

mod common;

use common::{vertex, OrgChart};
use hierarchy_core::{
    config::HierarchyConfig,
    db::SqliteEdgeSource,
    loader::{bootstrap, EdgeIter, EdgeSource},
    vertex::NodeEdge,
    HierarchyError,
};
use tempfile::TempDir;

async fn open_temp_source(temp_dir: &TempDir) -> SqliteEdgeSource {
    SqliteEdgeSource::open(temp_dir.path().join("hierarchy.db"))
        .await
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_pages_follow_insertion_order() {
    let temp_dir = TempDir::new().unwrap();
    let source = open_temp_source(&temp_dir).await;
    source.insert_node(&vertex("A"), None).await.unwrap();
    source
        .insert_node(&vertex("B"), Some(&vertex("A")))
        .await
        .unwrap();
    source
        .insert_node(&vertex("C"), Some(&vertex("B")))
        .await
        .unwrap();

    assert_eq!(source.count().await.unwrap(), 3);
    assert_eq!(
        source.get_edge_page(0, 2).await.unwrap(),
        vec![
            NodeEdge::new(vertex("A"), None),
            NodeEdge::new(vertex("B"), Some(vertex("A"))),
        ]
    );
    assert_eq!(
        source.get_edge_page(2, 2).await.unwrap(),
        vec![NodeEdge::new(vertex("C"), Some(vertex("B")))]
    );
    assert!(source.get_edge_page(4, 2).await.unwrap().is_empty());

    let mut iter = EdgeIter::new(&source, 2);
    let mut seen = 0;
    while iter.next().await.unwrap().is_some() {
        seen += 1;
    }
    assert_eq!(seen, 3);
}

#[test_log::test(tokio::test)]
async fn test_reopen_keeps_rows() {
    let temp_dir = TempDir::new().unwrap();
    {
        let source = open_temp_source(&temp_dir).await;
        source.insert_node(&vertex("A"), None).await.unwrap();
        source.0.close().await;
    }
    let source = open_temp_source(&temp_dir).await;
    assert_eq!(source.count().await.unwrap(), 1);
}

#[test_log::test(tokio::test)]
async fn test_bootstrap_from_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let source = open_temp_source(&temp_dir).await;
    let chart = OrgChart::generate(3, 3);
    for pair in chart.pairs.iter() {
        source
            .insert_node(&pair.node, pair.parent.as_ref())
            .await
            .unwrap();
    }

    let config = HierarchyConfig {
        page_size: 5,
        ..Default::default()
    };
    let (tree, _processor, report) = bootstrap(&config, &source).await.unwrap();
    assert_eq!(report.pairs, chart.positions.len());
    assert_eq!(report.roots, 1);
    assert!(tree.is_ancestor(&chart.root, chart.leaf()).unwrap());
    assert_eq!(
        tree.nested_child_ids(&chart.root).unwrap().len(),
        chart.positions.len()
    );
}

#[test_log::test(tokio::test)]
async fn test_in_memory_database() {
    let source = SqliteEdgeSource::connect("sqlite::memory:").await.unwrap();
    source.insert_node(&vertex("A"), None).await.unwrap();
    assert_eq!(source.count().await.unwrap(), 1);
}

#[test_log::test(tokio::test)]
async fn test_malformed_row_fails_startup() {
    let temp_dir = TempDir::new().unwrap();
    let source = open_temp_source(&temp_dir).await;
    source.insert_node(&vertex("A"), None).await.unwrap();
    sqlx::query("INSERT INTO job_positions (id, parent_id) VALUES ('bad:id', 'A')")
        .execute(&source.0)
        .await
        .unwrap();

    assert!(matches!(
        source.get_edge_page(0, 10).await,
        Err(HierarchyError::InvalidVertex(_))
    ));
    let result = bootstrap(&HierarchyConfig::default(), &source).await;
    assert!(matches!(result, Err(HierarchyError::Startup(_))));
}
