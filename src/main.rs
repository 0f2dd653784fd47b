use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;

use hardmax_plugin::{
    Attribute, DeviceBuffer, ExecutionStream, HostBackend, HostStream, PluginError,
    PluginRegistry, SymbolicDim, TensorDesc,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the hardmax operator plugin over a JSON tensor", long_about = None)]
struct Cli {
    /// Path to a JSON file with `shape` (list of extents) and `data`
    /// (row-major float values).
    tensor: PathBuf,
    /// Reduction axis; negative values count from the last dimension.
    #[arg(long, default_value_t = -1)]
    axis: i32,
    /// Optional path to write the plugin's serialized state blob.
    #[arg(long)]
    serialize_out: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct TensorFile {
    shape: Vec<i64>,
    data: Vec<f32>,
}

fn load_tensor(path: &PathBuf) -> Result<TensorFile, PluginError> {
    let raw = std::fs::read_to_string(path).map_err(|err| PluginError::Io {
        path: path.clone(),
        source: err,
    })?;
    let tensor: TensorFile = serde_json::from_str(&raw)?;
    let expected: usize = tensor.shape.iter().map(|&d| d.max(0) as usize).product();
    if tensor.data.len() != expected {
        return Err(PluginError::InputLengthMismatch {
            expected,
            actual: tensor.data.len(),
        });
    }
    Ok(tensor)
}

fn run() -> Result<(), PluginError> {
    let cli = Cli::parse();
    let tensor = load_tensor(&cli.tensor)?;

    let registry = PluginRegistry::with_defaults();
    let factory = registry.lookup("Hardmax", "1")?;
    let mut plugin = factory.build("hardmax_cli", &[Attribute::int32("axis", cli.axis)])?;

    let symbolic: Vec<SymbolicDim> = tensor
        .shape
        .iter()
        .map(|&d| SymbolicDim::from_concrete(d))
        .collect();
    let output_shape = plugin.output_dimensions(0, &[symbolic])?;

    let desc = TensorDesc::linear_f32(tensor.shape.clone());
    let candidates = vec![desc.clone(), desc.clone()];
    for pos in 0..candidates.len() {
        if !plugin.supports_format_combination(pos, &candidates, 1)? {
            eprintln!("error: negotiated format rejected at position {pos}");
            std::process::exit(1);
        }
    }
    plugin.configure(std::slice::from_ref(&desc), std::slice::from_ref(&desc))?;
    let workspace = plugin.workspace_size(std::slice::from_ref(&desc), std::slice::from_ref(&desc))?;

    plugin.initialize(Arc::new(HostBackend))?;
    let stream = HostStream::new();
    let input = DeviceBuffer::from_vec(tensor.data);
    let output = DeviceBuffer::zeroed(input.len());
    plugin.enqueue(
        std::slice::from_ref(&input),
        std::slice::from_ref(&output),
        &stream,
    )?;
    stream.synchronize();

    let shape_display: Vec<String> = output_shape.iter().map(|d| d.to_string()).collect();
    println!(
        "Ran `{}` version `{}` over shape [{}] (workspace {} bytes).",
        plugin.type_name(),
        plugin.version(),
        shape_display.join(", "),
        workspace
    );

    let result = output.to_vec();
    let inner: usize = match tensor.shape.last() {
        Some(&last) if tensor.shape.len() > 1 => last as usize,
        _ => result.len(),
    };
    for row in result.chunks(inner.max(1)) {
        let cells: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
        println!("  [{}]", cells.join(", "));
    }

    if let Some(path) = cli.serialize_out {
        let blob = plugin.serialized_state()?;
        std::fs::write(&path, &blob).map_err(|err| PluginError::export(path.clone(), err))?;
        // Prove the load path accepts what we just wrote.
        let restored = factory.deserialize("hardmax_cli", &blob)?;
        println!(
            "Serialized {} byte(s) to `{}` (reloads as `{}`).",
            blob.len(),
            path.display(),
            restored.type_name()
        );
    }

    plugin.terminate()?;
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
