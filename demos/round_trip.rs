//! Round Trip - register, encode and dispatch on decode.
//!
//! This example demonstrates:
//! - Building a codec with two registered payload types
//! - Writing newline-delimited envelopes to one stream
//! - Decoding them back one at a time and dispatching on the concrete type
//!
//! ```text
//! cargo run --example round_trip
//! ```

use std::io::{BufReader, Cursor};

use payload_codec::codec::Sink;
use payload_codec::{Codec, Payload};
use serde::{Deserialize, Serialize};

/// A greeting sent by a peer.
#[derive(Serialize, Deserialize, Debug, Default)]
struct Greeting {
    from: String,
    text: String,
}

impl Payload for Greeting {
    fn tag(&self) -> &str {
        "demo.Greeting"
    }
}

/// A batch of temperature samples.
#[derive(Serialize, Deserialize, Debug)]
struct Temperatures {
    unit: String,
    samples: Vec<f32>,
}

impl Payload for Temperatures {
    fn tag(&self) -> &str {
        "demo.Temperatures"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let codec = Codec::builder()
        .register_default::<Greeting>()
        // Readings that omit the unit are in celsius.
        .register(|| Temperatures {
            unit: "C".to_string(),
            samples: Vec::new(),
        })
        .build();

    let mut stream = Vec::new();
    codec.encode_to(
        Sink::Writer(&mut stream),
        &Greeting {
            from: "sensor-7".to_string(),
            text: "online".to_string(),
        },
    )?;
    codec.encode_to(
        Sink::Writer(&mut stream),
        &Temperatures {
            unit: "F".to_string(),
            samples: vec![68.0, 68.5],
        },
    )?;
    // A peer that leaves out the unit, and one speaking a newer protocol.
    stream.extend_from_slice(b"{\"T\":\"demo.Temperatures\",\"D\":null,\"Data\":{\"samples\":[21.5]}}\n");
    stream.extend_from_slice(b"{\"T\":\"demo.Shutdown\",\"D\":null,\"Data\":{}}\n");

    print!("{}", String::from_utf8_lossy(&stream));

    let mut reader = BufReader::new(Cursor::new(stream));
    for _ in 0..4 {
        let payload = codec.decode_reader(&mut reader);
        if let Some(err) = payload.as_error() {
            println!("error: {err}");
        } else if let Some(greeting) = payload.downcast_ref::<Greeting>() {
            println!("{} says {}", greeting.from, greeting.text);
        } else if let Some(temps) = payload.downcast_ref::<Temperatures>() {
            println!("{} samples in {}: {:?}", temps.samples.len(), temps.unit, temps.samples);
        }
    }

    Ok(())
}
