use serde::{Deserialize, Serialize};

/// 移動計算の結果
///
/// ロボット・ミサイル共通の1ターン分の移動結果です。呼び出し側で即座に
/// エンティティへ反映され、保存はされません。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveData {
    /// 移動後のX座標（m）
    pub x: f64,
    /// 移動後のY座標（m）
    pub y: f64,
    /// 累積移動距離（m）
    pub distance: f64,
    /// 射程または盤面端で移動が打ち切られた場合はtrue
    pub collision: bool,
}

/// 数学ユーティリティ関数
///
/// 角度はすべて度で扱い、0度が+Y方向、時計回りが正です。
pub mod math_utils {
    /// 角度を(-180度, 180度]の範囲に正規化
    pub fn normalize_angle_180(angle_deg: f64) -> f64 {
        let normalized = angle_deg % 360.0;
        if normalized > 180.0 {
            normalized - 360.0
        } else if normalized <= -180.0 {
            normalized + 360.0
        } else {
            normalized
        }
    }

    /// 点2から見た点1の方位角（度）
    ///
    /// `atan2(x1 - x2, y1 - y2)` を度に変換して正規化します。
    /// 引数の順序に注意してください: 方位は2点目から1点目に向かう向きです。
    pub fn angle_to_xy(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        normalize_angle_180((x1 - x2).atan2(y1 - y2) * 180.0 / std::f64::consts::PI)
    }

    /// 2点間のユークリッド距離（m）
    pub fn distance_to_xy(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
        let delta_x = x1 - x2;
        let delta_y = y1 - y2;
        (delta_x.powi(2) + delta_y.powi(2)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::math_utils::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_normalize_angle_in_range_is_identity() {
        for angle in [0.0, 45.5, -90.0, 179.999, 180.0, -179.5] {
            assert_eq!(normalize_angle_180(angle), angle);
        }
    }

    #[test]
    fn test_normalize_angle_wraps_out_of_range() {
        assert_eq!(normalize_angle_180(270.0), -90.0);
        assert_eq!(normalize_angle_180(-270.0), 90.0);
        assert_eq!(normalize_angle_180(-180.0), 180.0);
        assert_eq!(normalize_angle_180(540.0), 180.0);
        assert_eq!(normalize_angle_180(720.0), 0.0);
        assert_eq!(normalize_angle_180(360.0 * 1000.0 + 10.0), 10.0);
        assert_eq!(normalize_angle_180(-360.0 * 1000.0 - 10.0), -10.0);
    }

    #[test]
    fn test_normalize_angle_is_idempotent_and_bounded() {
        let mut angle = -7200.0;
        while angle <= 7200.0 {
            let once = normalize_angle_180(angle);
            assert!(once > -180.0 && once <= 180.0, "{angle} -> {once}");
            assert_eq!(normalize_angle_180(once), once);
            angle += 37.25;
        }
    }

    #[test]
    fn test_angle_to_xy_bearing_from_second_point() {
        // 真北(+Y)
        assert_eq!(angle_to_xy(100.0, 400.0, 100.0, 100.0), 0.0);
        // 真東(+X)
        assert_eq!(angle_to_xy(200.0, 100.0, 100.0, 100.0), 90.0);
        // 真南
        assert_eq!(angle_to_xy(100.0, 0.0, 100.0, 100.0), 180.0);
        // 真西
        assert_eq!(angle_to_xy(0.0, 100.0, 100.0, 100.0), -90.0);
        assert_close(angle_to_xy(0.0, 0.0, 100.0, 100.0), -135.0);
        assert_close(angle_to_xy(200.0, 200.0, 100.0, 100.0), 45.0);
    }

    #[test]
    fn test_angle_to_xy_argument_order_flips_bearing() {
        let forward = angle_to_xy(300.0, 500.0, 100.0, 100.0);
        let backward = angle_to_xy(100.0, 100.0, 300.0, 500.0);
        assert_close(normalize_angle_180(forward - backward).abs(), 180.0);
    }

    #[test]
    fn test_distance_to_xy() {
        assert_eq!(distance_to_xy(0.0, 0.0, 3.0, 4.0), 5.0);
        assert_eq!(distance_to_xy(100.0, 100.0, 100.0, 400.0), 300.0);
        assert_eq!(distance_to_xy(7.0, 7.0, 7.0, 7.0), 0.0);
    }
}
