//! Flow fields stored in matrix files with named `u`/`v` arrays.
//!
//! Container parsing is delegated to the `matfile` crate; this module only
//! locates the two named channels, converts the column-major matrix layout
//! to the row-major field layout, and stacks them into a 2-channel field.

use std::fs::File;
use std::path::Path;

use matfile::{MatFile, NumericData};

use crate::field::Field;
use crate::io::{format_error, io_error, CodecResult, FormatReason};

struct Channel {
    rows: usize,
    cols: usize,
    /// Column-major, as stored in the container.
    data: Vec<f64>,
}

fn channel(mat: &MatFile, name: &'static str) -> Result<Channel, FormatReason> {
    let array = mat
        .find_by_name(name)
        .ok_or(FormatReason::MissingChannel { name })?;

    let size = array.size();
    if size.len() != 2 {
        return Err(FormatReason::Container(format!(
            "channel {:?} is {}-dimensional, expected 2",
            name,
            size.len()
        )));
    }

    let data = match array.data() {
        NumericData::Double { real, .. } => real.clone(),
        NumericData::Single { real, .. } => real.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(FormatReason::Container(format!(
                "channel {:?} has a non-floating-point element type",
                name
            )))
        }
    };

    Ok(Channel {
        rows: size[0],
        cols: size[1],
        data,
    })
}

/// Stack column-major `u`/`v` channels into a row-major 2-channel field.
fn stack(u: &Channel, v: &Channel) -> Result<Field, FormatReason> {
    if (u.rows, u.cols) != (v.rows, v.cols) {
        return Err(FormatReason::Container(format!(
            "channel shapes differ: u is {}x{}, v is {}x{}",
            u.rows, u.cols, v.rows, v.cols
        )));
    }

    let (h, w) = (u.rows, u.cols);
    let mut data = Vec::with_capacity(h * w * 2);
    for y in 0..h {
        for x in 0..w {
            data.push(u.data[x * h + y]);
            data.push(v.data[x * h + y]);
        }
    }

    let mut field =
        Field::from_vec(h, w, 2, data).map_err(|e| FormatReason::Container(e.to_string()))?;
    field.normalize_invalid();
    Ok(field)
}

/// Read a flow field from a `.mat` file with named `u` and `v` arrays.
pub fn read_mat_flow(path: &Path) -> CodecResult<Field> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let mat = MatFile::parse(file)
        .map_err(|e| format_error(path, FormatReason::Container(e.to_string())))?;

    let u = channel(&mat, "u").map_err(|r| format_error(path, r))?;
    let v = channel(&mat, "v").map_err(|r| format_error(path, r))?;
    stack(&u, &v).map_err(|r| format_error(path, r))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chan(rows: usize, cols: usize, data: Vec<f64>) -> Channel {
        Channel { rows, cols, data }
    }

    #[test]
    fn stack_transposes_column_major_channels() {
        // 2x3 matrix in column-major order: columns [1 4], [2 5], [3 6]
        let u = chan(2, 3, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let v = chan(2, 3, vec![10.0, 40.0, 20.0, 50.0, 30.0, 60.0]);
        let field = stack(&u, &v).unwrap();

        assert_eq!(field.shape(), (2, 3, 2));
        assert_eq!(field.pixel(0, 0), &[1.0, 10.0]);
        assert_eq!(field.pixel(0, 2), &[3.0, 30.0]);
        assert_eq!(field.pixel(1, 1), &[5.0, 50.0]);
    }

    #[test]
    fn stack_normalizes_single_channel_nans() {
        let u = chan(1, 2, vec![f64::NAN, 2.0]);
        let v = chan(1, 2, vec![1.0, 3.0]);
        let field = stack(&u, &v).unwrap();
        assert!(!field.is_valid(0, 0));
        assert!(field.get(0, 0, 1).is_nan());
        assert!(field.is_valid(0, 1));
    }

    #[test]
    fn stack_rejects_shape_mismatch() {
        let u = chan(2, 2, vec![0.0; 4]);
        let v = chan(2, 3, vec![0.0; 6]);
        assert!(matches!(
            stack(&u, &v).unwrap_err(),
            FormatReason::Container(_)
        ));
    }
}
