fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Proto file is located in ../proto/
    let proto_path = "../proto";
    let proto_file = format!("{}/kestrel.proto", proto_path);

    println!("cargo:rerun-if-changed={}", proto_file);
    println!("cargo:rerun-if-env-changed=KESTREL_REGENERATE_PROTO");

    // The generated client is checked in so that building does not require protoc.
    // Set KESTREL_REGENERATE_PROTO=1 after editing the proto to refresh it.
    if std::env::var_os("KESTREL_REGENERATE_PROTO").is_none() {
        return Ok(());
    }

    if std::path::Path::new(&proto_file).exists() {
        tonic_build::configure()
            .build_server(false)
            .build_client(true)
            .out_dir("src/generated")
            .compile_protos(&[&proto_file], &[proto_path])?;
    } else {
        println!(
            "cargo:warning=Proto file not found at {}, skipping gRPC code generation",
            proto_file
        );
    }

    Ok(())
}
