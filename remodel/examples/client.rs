use futures_util::StreamExt;
use remodel::{roles, Client, ClientOptions, IndexPath, Orientation, DEFAULT_PORT};

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let client = Client::connect(("127.0.0.1", DEFAULT_PORT), ClientOptions::default())
        .await
        .unwrap();

    let root = IndexPath::root();
    let rows = client.row_count(&root).await.unwrap();
    let columns = client.column_count(&root).await.unwrap();
    println!("replica holds {rows} rows x {columns} columns");

    for column in 0..columns {
        let header = client
            .header_data(column, Orientation::Horizontal, roles::DISPLAY)
            .await
            .unwrap();
        print!("{header:?}\t");
    }
    println!();
    for row in 0..rows {
        for column in 0..columns {
            let value = client
                .data(&root.child(row, column), roles::DISPLAY)
                .await
                .unwrap();
            print!("{value:?}\t");
        }
        println!();
    }

    println!("watching for changes, ctrl-c to quit");
    let notifications = client.notifications();
    tokio::pin!(notifications);
    while let Some(event) = notifications.next().await {
        println!("{event:?}");
    }
}
