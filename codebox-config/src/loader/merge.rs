use toml::Value;

/// Deep-merge `overlay` into `base`.
///
/// Tables merge key by key; anything else, arrays included, is replaced
/// wholesale, so a workspace `trace_targets = []` clears the user's list.
pub fn merge_toml_values(base: &mut Value, overlay: &Value) {
    if let Value::Table(overlay_table) = overlay
        && let Value::Table(base_table) = base
    {
        for (key, overlay_value) in overlay_table {
            match base_table.get_mut(key) {
                Some(existing) => merge_toml_values(existing, overlay_value),
                None => {
                    base_table.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        return;
    }
    *base = overlay.clone();
}
