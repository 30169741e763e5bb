use remodel::{flags, roles, IndexPath, Orientation, Variant};

use crate::{display, serve_and_connect, GridModel};

#[tokio::test]
async fn four_by_four_replicates() {
    let (_publisher, client) = serve_and_connect(GridModel::flat(4, 4)).await;
    let root = IndexPath::root();

    assert_eq!(client.row_count(&root).await.unwrap(), 4);
    assert_eq!(client.column_count(&root).await.unwrap(), 4);
    assert!(client.has_children(&root).await.unwrap());

    let first = root.child(0, 0);
    assert_eq!(
        client.data(&first, roles::DISPLAY).await.unwrap(),
        display("row 0, column 0")
    );
    assert!(!client.has_children(&first).await.unwrap());
    assert_eq!(
        client.data(&root.child(3, 2), roles::DISPLAY).await.unwrap(),
        display("row 3, column 2")
    );
}

#[tokio::test]
async fn empty_model_stays_empty() {
    let (_publisher, client) = serve_and_connect(GridModel::flat(0, 0)).await;
    let root = IndexPath::root();

    assert!(!client.has_children(&root).await.unwrap());
    assert_eq!(client.row_count(&root).await.unwrap(), 0);
    assert_eq!(client.column_count(&root).await.unwrap(), 0);
    assert_eq!(client.index(0, 0, &root).await.unwrap(), None);
}

#[tokio::test]
async fn single_cell_bootstrap() {
    let (_publisher, client) = serve_and_connect(GridModel::flat(1, 1)).await;
    let root = IndexPath::root();

    assert_eq!(client.row_count(&root).await.unwrap(), 1);
    assert_eq!(client.column_count(&root).await.unwrap(), 1);
    let only = client.index(0, 0, &root).await.unwrap();
    assert_eq!(only, Some(root.child(0, 0)));
    assert_eq!(client.index(0, 1, &root).await.unwrap(), None);
    assert_eq!(client.index(1, 0, &root).await.unwrap(), None);
    assert!(!client.has_children(&root.child(0, 0)).await.unwrap());
}

#[tokio::test]
async fn remote_value_queries() {
    let (_publisher, client) = serve_and_connect(GridModel::flat(4, 4)).await;
    let root = IndexPath::root();
    let cell = root.child(1, 2);

    let names = client.role_names().await.unwrap();
    assert_eq!(names.get(&roles::DISPLAY), Some(&b"display".to_vec()));

    assert_eq!(
        client
            .header_data(1, Orientation::Horizontal, roles::DISPLAY)
            .await
            .unwrap(),
        display("column 1")
    );
    assert_eq!(
        client
            .header_data(3, Orientation::Vertical, roles::DISPLAY)
            .await
            .unwrap(),
        display("row 3")
    );

    assert_eq!(
        client.flags(&cell).await.unwrap(),
        flags::SELECTABLE | flags::ENABLED
    );
    assert_eq!(client.buddy(&cell).await.unwrap(), cell);
    assert_eq!(client.sibling(3, 0, &cell).await.unwrap(), root.child(3, 0));

    let item = client.item_data(&cell).await.unwrap();
    assert_eq!(item.get(&roles::DISPLAY), Some(&display("row 1, column 2")));

    assert!(!client.can_fetch_more(&root).await.unwrap());
    client.fetch_more(&root).await.unwrap();
    assert!(client.submit().await.unwrap());

    assert_eq!(client.parent(&cell), Some(root.clone()));
    assert_eq!(client.parent(&root), None);
    assert_eq!(
        client.data(&cell, roles::TOOL_TIP).await.unwrap(),
        Variant::Null
    );
}
