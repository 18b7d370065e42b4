use crate::schema::Registry;
use crate::types::{Row, Table};
use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Metadata field naming the table of a bundle line
pub const TABLE_FIELD: &str = "_table";

/// Writes tables to JSON Lines files, one `<table>.jsonl` per table
pub struct TableWriter {
    output_dir: PathBuf,
}

impl TableWriter {
    /// Create a writer for files in `output_dir`, creating it if needed
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
        Ok(TableWriter { output_dir })
    }

    /// Write each table to its own file, replacing previous content.
    /// Returns the written paths.
    pub fn write_tables(&self, tables: &[Table]) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(tables.len());
        for table in tables {
            let path = self.output_dir.join(format!("{}.jsonl", table.name));
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            for row in &table.rows {
                let json = serde_json::to_string(&table.row_object(row))
                    .context("Failed to serialize row")?;
                writeln!(writer, "{}", json).context("Failed to write row")?;
            }
            writer.flush().context("Failed to flush writer")?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Writes all tables to a single stream, tagging rows with `_table`
pub struct BundleWriter<W: Write> {
    writer: W,
}

impl<W: Write> BundleWriter<W> {
    pub fn new(writer: W) -> Self {
        BundleWriter { writer }
    }

    pub fn write_tables(&mut self, tables: &[Table]) -> Result<()> {
        for table in tables {
            for row in &table.rows {
                let mut data = Map::new();
                data.insert(TABLE_FIELD.to_string(), Value::String(table.name.clone()));
                data.extend(table.row_object(row));

                let json = serde_json::to_string(&data).context("Failed to serialize row")?;
                writeln!(self.writer, "{}", json).context("Failed to write row")?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

/// Read a bundle back into tables laid out by `registry`
///
/// Every registered table is returned, in registry order, empty when the
/// bundle has no rows for it. Missing columns read as empty values.
pub fn read_bundle<R: BufRead>(reader: R, registry: &Registry) -> Result<Vec<Table>> {
    let mut tables: Vec<Table> = registry.types().iter().map(|spec| spec.empty_table()).collect();
    let positions: HashMap<String, usize> = tables
        .iter()
        .enumerate()
        .map(|(idx, table)| (table.name.clone(), idx))
        .collect();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let data: Map<String, Value> = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON on line {}", line_num + 1))?;
        let name = match data.get(TABLE_FIELD) {
            Some(Value::String(name)) => name,
            _ => bail!("Line {} has no `{}` field", line_num + 1, TABLE_FIELD),
        };
        let Some(&idx) = positions.get(name) else {
            bail!("Line {} names unknown table `{}`", line_num + 1, name);
        };

        let table = &mut tables[idx];
        let values: Vec<String> = table
            .columns
            .iter()
            .map(|column| match data.get(&column.name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        let key = table.key_of(&values);
        table.rows.push(Row { key, values });
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, TypeSpec};
    use std::io::Cursor;

    fn registry() -> Registry {
        Registry::new()
            .with_type(
                TypeSpec::new("fvTenant", "tenant")
                    .column(ColumnSpec::attribute("tenant", "name").namespace("tenant"))
                    .column(ColumnSpec::attribute("description", "descr"))
                    .key(&["tenant"]),
            )
            .with_type(
                TypeSpec::new("fvCtx", "vrf")
                    .column(ColumnSpec::attribute("vrf", "name"))
                    .key(&["vrf"]),
            )
    }

    fn tenant_table() -> Table {
        let mut table = registry().table("tenant").unwrap().empty_table();
        for (name, descr) in [("Prod", "production"), ("Dev", "")] {
            let values = vec![name.to_string(), descr.to_string()];
            let key = table.key_of(&values);
            table.rows.push(Row { key, values });
        }
        table
    }

    #[test]
    fn test_bundle_writer_tags_rows() {
        let mut buffer = Vec::new();
        let mut writer = BundleWriter::new(&mut buffer);
        writer.write_tables(&[tenant_table()]).unwrap();
        writer.flush().unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let first = output.lines().next().unwrap();
        assert_eq!(first, r#"{"_table":"tenant","tenant":"Prod","description":"production"}"#);
    }

    #[test]
    fn test_read_bundle_restores_layout() {
        let input = "{\"_table\":\"tenant\",\"tenant\":\"Prod\"}\n\n{\"_table\":\"tenant\",\"description\":\"x\",\"tenant\":\"Dev\"}\n";
        let tables = read_bundle(Cursor::new(input), &registry()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].len(), 2);
        assert_eq!(tables[0].rows[0].values, vec!["Prod", ""]);
        assert_eq!(tables[0].rows[1].values, vec!["Dev", "x"]);
        assert_eq!(tables[0].columns[0].namespace.as_deref(), Some("tenant"));
        assert!(tables[1].is_empty());
    }

    #[test]
    fn test_read_bundle_rejects_unknown_table() {
        let input = "{\"_table\":\"nope\"}\n";
        assert!(read_bundle(Cursor::new(input), &registry()).is_err());
        assert!(read_bundle(Cursor::new("{\"tenant\":\"A\"}\n"), &registry()).is_err());
    }

    #[test]
    fn test_table_writer_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TableWriter::new(dir.path().join("out")).unwrap();
        let empty = registry().table("vrf").unwrap().empty_table();
        let paths = writer.write_tables(&[tenant_table(), empty]).unwrap();

        assert_eq!(paths.len(), 2);
        let tenants = std::fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(tenants.lines().count(), 2);
        assert!(paths[0].ends_with("tenant.jsonl"));
        assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "");
    }
}
