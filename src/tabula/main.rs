//! # tabula
//!
//! Operator console for the tabula list-view engine. The library lives in
//! `lib.rs` and its modules; the CLI lives in `cli/`, and this file only invokes
//! `cli::run()` and maps failures to an exit code.
//!
//! ```text
//! tabula --host site.json scopes
//! tabula --host site.json save listing columns.json
//! tabula --host site.json list listing --orderby price --order desc
//! tabula --host site.json export listing --columns price,title --filter status=published
//! ```
//!
//! Set `RUST_LOG=tabula=debug` (or pass `--verbose`) to trace sort and filter
//! translation.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
