//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the diary API. The output path is the first
//! argument, `openapi.json` by default.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn write_document(path: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let document = ApiDoc::openapi();
    std::fs::write(path, document.to_pretty_json()?)?;
    Ok(document.paths.paths.len())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let routes = write_document(&path)?;
    println!("OpenAPI document with {} paths written to {}", routes, path);
    Ok(())
}
