//! gRPC/protobuf code generated from `proto/kestrel.proto`.
//!
//! The output is checked in; regenerate with `KESTREL_REGENERATE_PROTO=1 cargo build -p kestrel-core`.

#[allow(clippy::all)]
#[allow(missing_docs)]
pub mod kestrel_v1 {
    include!("kestrel.v1.rs");
}
