#[cfg(test)]
mod tests {
    use crate::error::EtlError;
    use crate::io::loaders::{normalize_schema, LoadResult, SourceType, TransactionLoader};
    use crate::io::writers::write_parquet;
    use polars::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_CSV: &str = "customer_id,transaction_date,product_category,sales_amount,quantity,cost,region\n\
C001,2024-01-05,Electronics,1200,1,900,North\n\
C002,2024-01-06,Grocery,35.5,3,20.25,South\n\
1003,2024-01-07,,80,2,50,\n";

    /// Helper to create a temp CSV file
    fn create_temp_csv_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    /// Test LoadResult::new
    #[test]
    fn test_load_result_new() {
        let df = df!("customer_id" => ["C1"], "sales_amount" => [1.0]).unwrap();
        let result = LoadResult::new(df, SourceType::Csv);

        assert_eq!(result.source_type, SourceType::Csv);
        assert_eq!(result.num_rows, 1);
    }

    /// Test load_from_file with CSV extension auto-detection
    #[test]
    fn test_load_from_file_csv() {
        let csv_file = create_temp_csv_file(SAMPLE_CSV);
        let result = TransactionLoader::load_from_file(csv_file.path());

        assert!(result.is_ok(), "Should load CSV file: {:?}", result.err());
        let load_result = result.unwrap();
        assert_eq!(load_result.source_type, SourceType::Csv);
        assert_eq!(load_result.num_rows, 3);
    }

    /// Integer-looking amounts and numeric ids are normalised
    #[test]
    fn test_load_csv_normalizes_types() {
        let csv_file = create_temp_csv_file(SAMPLE_CSV);
        let df = TransactionLoader::load_csv(csv_file.path())
            .unwrap()
            .dataframe;

        assert_eq!(df.column("customer_id").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("sales_amount").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("cost").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("quantity").unwrap().dtype(), &DataType::Int64);

        let ids = df.column("customer_id").unwrap().str().unwrap();
        assert_eq!(ids.get(2), Some("1003"));

        let amounts = df.column("sales_amount").unwrap().f64().unwrap();
        assert_eq!(amounts.get(0), Some(1200.0));
    }

    /// Empty fields are read as nulls
    #[test]
    fn test_load_csv_keeps_nulls() {
        let df = TransactionLoader::load_csv_str(SAMPLE_CSV).unwrap().dataframe;

        assert_eq!(df.column("product_category").unwrap().null_count(), 1);
        assert_eq!(df.column("region").unwrap().null_count(), 1);
    }

    /// Test load_from_file with unsupported extension
    #[test]
    fn test_load_from_file_unsupported_extension() {
        let mut temp_file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(temp_file, "some content").unwrap();

        let result = TransactionLoader::load_from_file(temp_file.path());

        assert!(result.is_err(), "Should fail with unsupported extension");
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    /// Test load_from_file with no extension
    #[test]
    fn test_load_from_file_no_extension() {
        use std::path::PathBuf;
        let path = PathBuf::from("/tmp/file_without_extension");

        let result = TransactionLoader::load_from_file(&path);

        assert!(result.is_err(), "Should fail with no extension");
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("extension"),
            "Error should mention missing extension: {}",
            error_msg
        );
    }

    /// Files without the required columns are rejected
    #[test]
    fn test_load_csv_missing_required_column() {
        let result = TransactionLoader::load_csv_str("customer_id,region\nC1,North\n");

        assert!(result.is_err());
        let err = result.unwrap_err();
        let missing = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<EtlError>())
            .expect("EtlError in chain");
        assert!(matches!(missing, EtlError::MissingColumn(name) if name == "sales_amount"));
    }

    /// Parquet files written by the crate load back identically
    #[test]
    fn test_load_parquet() {
        let df = TransactionLoader::load_csv_str(SAMPLE_CSV).unwrap().dataframe;
        let file = NamedTempFile::with_suffix(".parquet").unwrap();
        write_parquet(&df, file.path()).unwrap();

        let loaded = TransactionLoader::load_from_file(file.path()).unwrap();
        assert_eq!(loaded.source_type, SourceType::Parquet);
        assert!(loaded.dataframe.equals_missing(&df));
    }

    /// Lookup tables are read as-is
    #[test]
    fn test_load_lookup() {
        let file = create_temp_csv_file("region,manager\nNorth,Ana\nSouth,Ben\n");
        let lookup = TransactionLoader::load_lookup(file.path()).unwrap();
        assert_eq!(lookup.shape(), (2, 2));
    }

    #[test]
    fn test_normalize_schema_unparseable_amount_becomes_null() {
        let df = df!(
            "customer_id" => ["C1", "C2"],
            "sales_amount" => ["10.5", "n/a"],
        )
        .unwrap();

        let df = normalize_schema(df).unwrap();
        let amounts = df.column("sales_amount").unwrap().f64().unwrap();
        assert_eq!(amounts.get(0), Some(10.5));
        assert_eq!(amounts.get(1), None);
    }
}
