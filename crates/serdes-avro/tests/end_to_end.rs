//! Producer/consumer round-trip through a stub registry.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use apache_avro::types::Value;
use serdes_avro::AvroSerdes;
use serdes_core::SerdesConfig;

const DEFINITION: &str =
    r#"{"type":"record","name":"Telemetry","fields":[{"name":"reading","type":"double"},{"name":"sensor","type":"string"}]}"#;

/// Minimal one-request-per-connection HTTP stub for the two registry
/// endpoints this test needs.
fn spawn_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            serve_one(stream);
        }
    });

    base_url
}

fn serve_one(stream: TcpStream) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).is_err() {
            return;
        }
        if header.trim_end().is_empty() {
            break;
        }
        if let Some(value) = header
            .trim_end()
            .to_ascii_lowercase()
            .strip_prefix("content-length:")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    let reply = match (method.as_str(), path.as_str()) {
        ("POST", "/subjects/telemetry-value/versions") => {
            serde_json::json!({"id": 12}).to_string()
        }
        ("GET", "/schemas/ids/12") => serde_json::json!({"schema": DEFINITION}).to_string(),
        _ => serde_json::json!({"error_code": 40401, "message": "Subject not found"}).to_string(),
    };

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/vnd.schemaregistry.v1+json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.len(),
        reply
    );
    let mut stream = stream;
    stream.write_all(response.as_bytes()).ok();
}

fn handle_for(base_url: &str) -> AvroSerdes {
    let mut conf = SerdesConfig::new();
    conf.set("schema.registry.url", base_url).unwrap();
    AvroSerdes::new(conf).unwrap()
}

#[test]
fn test_producer_consumer_roundtrip_via_registry() {
    let base_url = spawn_stub();

    // Producer: register the schema, serialize a record.
    let producer = handle_for(&base_url);
    let schema = producer
        .handle()
        .schema_add("telemetry-value", None, None, Some(DEFINITION.as_bytes()))
        .unwrap();
    assert_eq!(schema.id(), 12);

    let record = Value::Record(vec![
        ("reading".to_string(), Value::Double(21.5)),
        ("sensor".to_string(), Value::String("probe-a".to_string())),
    ]);
    let payload = producer.serialize(&schema, &record).unwrap();
    assert_eq!(&payload[..5], &[0x00, 0x00, 0x00, 0x00, 0x0c]);

    // Consumer: a fresh handle resolves the schema from the framing alone.
    let consumer = handle_for(&base_url);
    let (value, resolved) = consumer.deserialize(&payload).unwrap();
    assert_eq!(resolved.id(), 12);
    assert_eq!(resolved.schema_type(), "AVRO");
    assert_eq!(value, record);

    // Further messages decode from the consumer's cache alone.
    let payload = producer.serialize(&schema, &record).unwrap();
    let (value, _) = consumer.deserialize(&payload).unwrap();
    assert_eq!(value, record);
}
