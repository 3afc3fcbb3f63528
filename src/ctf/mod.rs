//! # CTF 参数换算核心
//!
//! 内部表示与各磁盘约定之间的纯数值换算，不修改任何输入。
//!
//! ## 约定
//! - 内部离焦：DefocusU / DefocusV，单位 Å，正值为欠焦
//! - 平均离焦与像散差：单位 µm，`Δ = (V − U) / 10000`
//! - 像散角：度，规范到 `[0, 180)`
//! - 振幅衬度：内部为分数，CTER 文件为百分比
//!
//! ## 依赖关系
//! - 被 `ctf/convert.rs`, `formats/` 使用
//! - 子模块: convert

pub mod convert;

pub use convert::{cter_to_internal, internal_to_cter, CterDialect, CterSchema};

use crate::error::{Result, TransformError};

/// 输出数值保留的小数位数
pub const OUTPUT_DIGITS: i32 = 7;

/// 平均离焦 (µm) 与像散差 (µm) → (DefocusU, DefocusV) (Å)
pub fn defocus_to_u_v(defocus: f64, astigmatism: f64) -> (f64, f64) {
    let defocus_u = (20000.0 * defocus - 10000.0 * astigmatism) / 2.0;
    let defocus_v = 20000.0 * defocus - defocus_u;
    (defocus_u, defocus_v)
}

/// (DefocusU, DefocusV) (Å) → 平均离焦 (µm) 与像散差 (µm)
pub fn u_v_to_defocus(defocus_u: f64, defocus_v: f64) -> (f64, f64) {
    let defocus = (defocus_u + defocus_v) / 20000.0;
    let astigmatism = (defocus_v - defocus_u) / 10000.0;
    (defocus, astigmatism)
}

/// 逐元素形式的 [`defocus_to_u_v`]
pub fn defocus_to_u_v_series(defocus: &[f64], astigmatism: &[f64]) -> (Vec<f64>, Vec<f64>) {
    defocus
        .iter()
        .zip(astigmatism)
        .map(|(d, a)| defocus_to_u_v(*d, *a))
        .unzip()
}

/// 逐元素形式的 [`u_v_to_defocus`]
pub fn u_v_to_defocus_series(defocus_u: &[f64], defocus_v: &[f64]) -> (Vec<f64>, Vec<f64>) {
    defocus_u
        .iter()
        .zip(defocus_v)
        .map(|(u, v)| u_v_to_defocus(*u, *v))
        .unzip()
}

/// 把角度规范到 `[0, 180)`
///
/// 已在区间内的值原样返回。
pub fn normalize_angle(angle: f64) -> f64 {
    if (0.0..180.0).contains(&angle) || !angle.is_finite() {
        return angle;
    }
    let wrapped = angle.rem_euclid(180.0);
    // rem_euclid 对极小负数会舍入到 180
    if wrapped >= 180.0 {
        0.0
    } else {
        wrapped
    }
}

/// 振幅衬度（百分比）→ 相位角（度，`[0, 180)`）
pub fn amplitude_contrast_to_angle(amplitude_contrast: f64) -> Result<f64> {
    if !(-100.0..=100.0).contains(&amplitude_contrast) {
        return Err(TransformError::AmplitudeContrastOutOfRange {
            value: amplitude_contrast,
        });
    }
    let radians = amplitude_contrast.atan2((1e4 - amplitude_contrast.powi(2)).sqrt());
    let radians = if radians < 0.0 {
        radians + std::f64::consts::PI
    } else {
        radians
    };
    Ok(radians.to_degrees())
}

/// 相位角（度）→ 振幅衬度（百分比）
pub fn angle_to_amplitude_contrast(angle: f64) -> f64 {
    let tan = angle.to_radians().tan();
    tan / (1.0 + tan.powi(2)).sqrt() * 100.0
}

/// 逐元素形式的 [`amplitude_contrast_to_angle`]；任一值越界即整体失败
pub fn amplitude_contrast_to_angles(values: &[f64]) -> Result<Vec<f64>> {
    values.iter().map(|v| amplitude_contrast_to_angle(*v)).collect()
}

/// 由振幅衬度（百分比）与相位板相移（度）推导总振幅衬度（百分比）
///
/// 两个相位源在角度域相加后再映射回衬度。
pub fn total_amplitude_contrast(amplitude_contrast: f64, phase_shift: f64) -> Result<f64> {
    let angle = amplitude_contrast_to_angle(amplitude_contrast)?;
    Ok(angle_to_amplitude_contrast(angle + phase_shift))
}

/// 逐元素倒数
pub fn reciprocal(values: &[f64]) -> Vec<f64> {
    values.iter().map(|v| 1.0 / v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_defocus_zero_astigmatism() {
        assert_eq!(defocus_to_u_v(2.0, 0.0), (20000.0, 20000.0));
        assert_eq!(u_v_to_defocus(20000.0, 20000.0), (2.0, 0.0));
    }

    #[test]
    fn test_defocus_with_astigmatism() {
        let (defocus, astigmatism) = u_v_to_defocus(21000.0, 20000.0);
        assert_abs_diff_eq!(defocus, 2.05, epsilon = 1e-12);
        assert_abs_diff_eq!(astigmatism, -0.1, epsilon = 1e-12);

        let (u, v) = defocus_to_u_v(defocus, astigmatism);
        assert_abs_diff_eq!(u, 21000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(v, 20000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_defocus_series_inversion() {
        let u = [20000.0, 21000.0, 18234.5, 30512.25];
        let v = [20000.0, 20000.0, 19012.75, 29987.0];
        let (defocus, astigmatism) = u_v_to_defocus_series(&u, &v);
        let (u2, v2) = defocus_to_u_v_series(&defocus, &astigmatism);
        for i in 0..u.len() {
            assert_abs_diff_eq!(u[i], u2[i], epsilon = 1e-9);
            assert_abs_diff_eq!(v[i], v2[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normalize_in_range_unchanged() {
        for angle in [0.0, 0.1, 19.435, 90.0, 179.999_999_9] {
            assert_eq!(normalize_angle(angle), angle);
        }
    }

    #[test]
    fn test_normalize_wraps() {
        assert_eq!(normalize_angle(180.0), 0.0);
        assert_eq!(normalize_angle(-10.0), 170.0);
        assert_eq!(normalize_angle(370.0), 10.0);
        assert_eq!(normalize_angle(-540.0), 0.0);
    }

    #[test]
    fn test_normalize_period_invariant() {
        for theta in [12.5, 45.0, 133.25] {
            for k in [-3i32, -1, 1, 4] {
                let shifted = theta + 180.0 * k as f64;
                assert_abs_diff_eq!(normalize_angle(shifted), theta, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_amplitude_contrast_angle_cases() {
        assert_abs_diff_eq!(amplitude_contrast_to_angle(0.0).unwrap(), 0.0);
        assert_abs_diff_eq!(amplitude_contrast_to_angle(100.0).unwrap(), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(amplitude_contrast_to_angle(-100.0).unwrap(), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(amplitude_contrast_to_angle(50.0).unwrap(), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(amplitude_contrast_to_angle(-50.0).unwrap(), 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_angle_amplitude_contrast_inversion() {
        for x in [-99.0, -50.0, -10.0, 0.0, 7.0, 10.0, 50.0, 99.0] {
            let angle = amplitude_contrast_to_angle(x).unwrap();
            assert_abs_diff_eq!(angle_to_amplitude_contrast(angle), x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_amplitude_contrast_out_of_range() {
        assert!(matches!(
            amplitude_contrast_to_angle(200.0),
            Err(TransformError::AmplitudeContrastOutOfRange { .. })
        ));
        assert!(amplitude_contrast_to_angle(-200.0).is_err());
        assert!(amplitude_contrast_to_angles(&[10.0, 200.0]).is_err());
        assert_eq!(amplitude_contrast_to_angles(&[0.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_total_amplitude_contrast() {
        assert_abs_diff_eq!(total_amplitude_contrast(10.0, 0.0).unwrap(), 10.0, epsilon = 1e-9);
        // 30° 固有相位 + 30° 相移 = 60°
        assert_abs_diff_eq!(
            total_amplitude_contrast(50.0, 30.0).unwrap(),
            60f64.to_radians().sin() * 100.0,
            epsilon = 1e-9
        );
        assert!(total_amplitude_contrast(150.0, 0.0).is_err());
    }
}
