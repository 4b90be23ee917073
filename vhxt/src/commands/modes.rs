//! Modes command implementation.
//!
//! Prints which accesses handles of each storage kind and type support,
//! together with the method type of every access.

use vhx_rt::{Access, Runtime, VarHandle};

use crate::commands::common::{parse_type, ProbeClass, StorageArg, BUILTIN_TYPES};
use crate::error::Result;

/// Arguments for the modes command.
#[derive(Debug, Clone, Default)]
pub struct ModesArgs {
    /// Restrict the table to one type.
    pub ty: Option<String>,
    /// Restrict the table to one storage kind.
    pub storage: Option<StorageArg>,
    /// Describe final fields.
    pub read_only: bool,
    /// Emit JSON instead of a table.
    pub json: bool,
}

/// Modes command handler.
pub struct ModesCommand<'a> {
    args: ModesArgs,
    runtime: &'a Runtime,
}

impl<'a> ModesCommand<'a> {
    pub fn new(args: ModesArgs, runtime: &'a Runtime) -> Self {
        Self { args, runtime }
    }

    /// Build one handle per selected (type, storage) pair and render them.
    pub fn run(&self) -> Result<String> {
        let types = match &self.args.ty {
            Some(name) => vec![parse_type(name)?],
            None => BUILTIN_TYPES.to_vec(),
        };
        let storages = match self.args.storage {
            Some(storage) => vec![storage],
            None => StorageArg::ALL.to_vec(),
        };

        let mut handles = Vec::with_capacity(types.len() * storages.len());
        for ty in types {
            // One loader per type: each defines its own `Probe`.
            let loader = self.runtime.new_loader(&format!("vhxt-modes-{}", ty));
            let probe = ProbeClass::define(&loader, ty, self.args.read_only)?;
            for &storage in &storages {
                handles.push(probe.handle(storage)?);
            }
            tracing::debug!("described {} handles of type {}", storages.len(), ty);
        }

        if self.args.json {
            let descs: Vec<_> = handles.iter().map(VarHandle::describe).collect();
            Ok(serde_json::to_string_pretty(&descs)?)
        } else {
            Ok(handles.iter().map(render_table).collect::<Vec<_>>().join("\n"))
        }
    }
}

/// Render every access of `vh`, marking the supported ones.
fn render_table(vh: &VarHandle) -> String {
    let mut out = format!(
        "{} {}{} ({}/{} accesses)\n",
        vh.storage_kind(),
        vh.var_type(),
        if vh.is_writable() { "" } else { " final" },
        vh.supported_accesses().len(),
        Access::COUNT
    );
    for access in Access::ALL {
        let mark = if vh.is_access_mode_supported(access) { "+" } else { "-" };
        out.push_str(&format!(
            "  {} {:<26} {:<8} {}\n",
            mark,
            access.name(),
            access.order().to_string(),
            vh.access_mode_type(access)
        ));
    }
    out
}

/// Run the modes command and print its output.
pub fn run_modes(args: ModesArgs, runtime: &Runtime) -> Result<()> {
    let output = ModesCommand::new(args, runtime).run()?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VhxtError;

    fn runtime() -> Runtime {
        vhx_rt::init().unwrap()
    }

    #[test]
    fn test_full_table() {
        let runtime = runtime();
        let out = ModesCommand::new(ModesArgs::default(), &runtime).run().unwrap();
        let headers = out.lines().filter(|l| !l.starts_with(' ') && !l.is_empty()).count();
        assert_eq!(headers, BUILTIN_TYPES.len() * StorageArg::ALL.len());
        assert!(out.contains("instance boolean (28/31 accesses)"));
        assert!(out.contains("array double (22/31 accesses)"));
    }

    #[test]
    fn test_final_static_reads_only() {
        let runtime = runtime();
        let args = ModesArgs {
            ty: Some("int".to_string()),
            storage: Some(StorageArg::Static),
            read_only: true,
            json: false,
        };
        let out = ModesCommand::new(args, &runtime).run().unwrap();
        assert!(out.starts_with("static int final (4/31 accesses)"));
        assert!(out.contains("+ get "));
        assert!(out.contains("- set "));
    }

    #[test]
    fn test_json_output() {
        let runtime = runtime();
        let args = ModesArgs {
            ty: Some("Object".to_string()),
            storage: Some(StorageArg::Array),
            read_only: false,
            json: true,
        };
        let out = ModesCommand::new(args, &runtime).run().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let desc = &parsed[0];
        assert_eq!(desc["storage"], "array");
        assert_eq!(desc["accesses"].as_array().unwrap().len(), 19);
        assert!(desc.get("field").is_none());
    }

    #[test]
    fn test_unknown_type() {
        let runtime = runtime();
        let args = ModesArgs {
            ty: Some("Integer".to_string()),
            ..ModesArgs::default()
        };
        let err = ModesCommand::new(args, &runtime).run().unwrap_err();
        assert!(matches!(err, VhxtError::Validation(_)));
    }
}
