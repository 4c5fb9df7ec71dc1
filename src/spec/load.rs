use super::build::build_operations;
use super::types::OperationDescriptor;
use oas3::OpenApiV3Spec;

fn strip_unknown_verbs(val: &mut serde_json::Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    if let Some(paths) = val.get_mut("paths") {
        if let serde_json::Value::Object(paths_map) = paths {
            for item in paths_map.values_mut() {
                if let serde_json::Value::Object(obj) = item {
                    let keys: Vec<String> = obj.keys().cloned().collect();
                    for k in keys {
                        let lk = k.to_ascii_lowercase();
                        let keep = match lk.as_str() {
                            "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                            m if METHODS.contains(&m) => true,
                            _ => k.starts_with("x-"),
                        };
                        if !keep {
                            obj.remove(&k);
                        }
                    }
                }
            }
        }
    }
}

/// Load an API description from a YAML or JSON file and flatten it into
/// operation descriptors, preserving document order.
pub fn load_spec(file_path: &str) -> anyhow::Result<Vec<OperationDescriptor>> {
    let content = std::fs::read_to_string(file_path)?;
    let mut value: serde_json::Value = if file_path.ends_with(".yaml") || file_path.ends_with(".yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    strip_unknown_verbs(&mut value);
    let spec: OpenApiV3Spec = serde_json::from_value(value)?;

    build_operations(&spec)
}

/// Build operation descriptors from an already parsed [`OpenApiV3Spec`].
pub fn load_spec_from_spec(spec: &OpenApiV3Spec) -> anyhow::Result<Vec<OperationDescriptor>> {
    build_operations(spec)
}
