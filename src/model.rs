use crate::error::{Error, Result};
use candle_core::Tensor;
use candle_onnx::{onnx, read_file, simple_eval};
use hf_hub::api::sync::Api;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A pretrained network evaluated one input tensor at a time.
///
/// Implementations must not mutate internal state in `forward`; a single
/// instance is shared by every request.
pub trait Network: Send + Sync {
    fn forward(&self, input: Tensor) -> Result<Tensor>;
}

/// ONNX graph evaluated with candle on the CPU.
pub struct OnnxNet {
    model: onnx::ModelProto,
    input_name: String,
    output_name: String,
}

impl OnnxNet {
    pub fn load(path: &Path) -> Result<Self> {
        let mut model = read_file(path).map_err(|source| Error::ModelLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let patched = patch_maxpool_padding(&mut model);
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| Error::MissingGraph(path.to_path_buf()))?;
        let input_name = graph
            .input
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| Error::MissingInput(path.to_path_buf()))?;
        let output_name = graph
            .output
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| Error::MissingOutput(path.display().to_string()))?;
        debug!(
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            patched_pools = patched,
            "model loaded"
        );
        Ok(Self {
            model,
            input_name,
            output_name,
        })
    }
}

impl Network for OnnxNet {
    fn forward(&self, input: Tensor) -> Result<Tensor> {
        let mut inputs = HashMap::new();
        inputs.insert(self.input_name.clone(), input);
        let mut outputs = simple_eval(&self.model, inputs)?;
        outputs
            .remove(&self.output_name)
            .ok_or_else(|| Error::MissingOutput(self.output_name.clone()))
    }
}

/// Finds `file` in `dir`, or downloads it from `repo` when one is given.
pub fn resolve_model(dir: &Path, file: &str, repo: Option<&str>) -> Result<PathBuf> {
    let local = dir.join(file);
    if local.exists() {
        return Ok(local);
    }
    let Some(repo) = repo else {
        return Err(Error::ModelNotFound(local));
    };
    info!(repo, file, "model not found locally, fetching");
    Api::new()
        .and_then(|api| api.model(repo.to_string()).get(file))
        .map_err(|e| Error::ModelFetch {
            file: file.to_string(),
            repo: repo.to_string(),
            reason: e.to_string(),
        })
}

pub fn load_network(dir: &Path, file: &str, repo: Option<&str>) -> Result<OnnxNet> {
    let path = resolve_model(dir, file, repo)?;
    OnnxNet::load(&path)
}

/// Moves MaxPool padding into a preceding Pad node. Returns the number of
/// nodes rewritten.
pub fn patch_maxpool_padding(model: &mut onnx::ModelProto) -> usize {
    let Some(graph) = model.graph.as_mut() else {
        return 0;
    };
    let mut patched = 0;
    let mut new_nodes = Vec::with_capacity(graph.node.len());
    for mut node in std::mem::take(&mut graph.node) {
        if node.op_type == "MaxPool" {
            let pads = node
                .attribute
                .iter_mut()
                .find(|attr| attr.name == "pads")
                .filter(|attr| attr.ints.len() == 4 && attr.ints.iter().any(|&v| v != 0))
                .map(|attr| std::mem::replace(&mut attr.ints, vec![0; 4]));
            if let Some(pads) = pads {
                // ONNX pads are [begin_h, begin_w, end_h, end_w]; Pad wants NCHW begins then ends.
                let full_pads = vec![0, 0, pads[0], pads[1], 0, 0, pads[2], pads[3]];
                let pad_init_name = format!("{}_pads", node.name);
                graph.initializer.push(onnx::TensorProto {
                    name: pad_init_name.clone(),
                    dims: vec![full_pads.len() as i64],
                    data_type: onnx::tensor_proto::DataType::Int64 as i32,
                    int64_data: full_pads,
                    ..Default::default()
                });

                let pad_output = format!("{}_pad_out", node.name);
                let mut pad_node = onnx::NodeProto {
                    input: vec![node.input[0].clone(), pad_init_name],
                    output: vec![pad_output.clone()],
                    name: format!("{}_pad", node.name),
                    op_type: "Pad".to_string(),
                    ..Default::default()
                };
                pad_node.attribute.push(onnx::AttributeProto {
                    name: "mode".to_string(),
                    r#type: onnx::attribute_proto::AttributeType::String as i32,
                    s: b"reflect".to_vec(),
                    ..Default::default()
                });
                new_nodes.push(pad_node);
                node.input[0] = pad_output;
                patched += 1;
            }
        }
        new_nodes.push(node);
    }
    graph.node = new_nodes;
    patched
}
