use std::sync::{Arc, Mutex};
use std::time::Duration;

use remodel::{
    roles, IndexPath, ItemModel, ModelPublisher, ModelServer, Orientation, Variant, DEFAULT_PORT,
};
use tokio::net::TcpListener;

/// Two-column roster; a background task appends a row every few seconds so
/// connected replicas have something to watch.
#[derive(Clone)]
struct Roster {
    rows: Arc<Mutex<Vec<[String; 2]>>>,
}

impl ItemModel for Roster {
    fn row_count(&self, parent: &IndexPath) -> u32 {
        if parent.is_root() {
            self.rows.lock().unwrap().len() as u32
        } else {
            0
        }
    }

    fn column_count(&self, parent: &IndexPath) -> u32 {
        if parent.is_root() {
            2
        } else {
            0
        }
    }

    fn data(&self, path: &IndexPath, role: i32) -> Variant {
        if role != roles::DISPLAY || path.depth() != 1 {
            return Variant::Null;
        }
        let (row, column) = match path.last() {
            Some(step) => step,
            None => return Variant::Null,
        };
        self.rows
            .lock()
            .unwrap()
            .get(row as usize)
            .and_then(|cells| cells.get(column as usize))
            .map(|text| Variant::String(text.clone()))
            .unwrap_or(Variant::Null)
    }

    fn header_data(&self, section: u32, orientation: Orientation, role: i32) -> Variant {
        if role != roles::DISPLAY {
            return Variant::Null;
        }
        match (orientation, section) {
            (Orientation::Horizontal, 0) => Variant::String("name".to_string()),
            (Orientation::Horizontal, 1) => Variant::String("email".to_string()),
            (Orientation::Vertical, row) => Variant::I32(row as i32 + 1),
            _ => Variant::Null,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::new()
        .parse_env(env_logger::Env::default().default_filter_or("info"))
        .init();

    let roster = Roster {
        rows: Arc::new(Mutex::new(vec![
            ["Ada".to_string(), "ada@example.com".to_string()],
            ["Blaise".to_string(), "blaise@example.com".to_string()],
        ])),
    };
    let (publisher, events) = ModelPublisher::channel();

    let updated = roster.clone();
    tokio::spawn(async move {
        let mut counter = 0u32;
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            counter += 1;
            let row = {
                let mut rows = updated.rows.lock().unwrap();
                rows.push([
                    format!("guest {counter}"),
                    format!("guest{counter}@example.com"),
                ]);
                rows.len() as u32 - 1
            };
            publisher.rows_about_to_be_inserted(IndexPath::root(), row, row);
            publisher.rows_inserted(IndexPath::root(), row, row);
        }
    });

    let listener = TcpListener::bind(("127.0.0.1", DEFAULT_PORT)).await.unwrap();
    log::info!("serving roster on {}", listener.local_addr().unwrap());
    ModelServer::new(roster).serve(listener, events).await.unwrap();
}
