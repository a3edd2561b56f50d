use crate::models::{
    common::{MoveData, math_utils},
    equipment::MissileWeapon,
    traits::Locatable,
};
use serde::{Deserialize, Serialize};

/// ミサイルの状態
///
/// 飛翔 → 直撃爆発 → 近接爆発 → 遠隔爆発 → 消滅 の順にのみ遷移します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissileStatus {
    #[default]
    Undefined,
    /// 飛翔中
    Flying,
    /// 直撃判定中の爆発
    ExplodingDirect,
    /// 近接判定中の爆発
    ExplodingNear,
    /// 遠隔判定中の爆発
    ExplodingFar,
    /// 消滅（ターン終了時に除去）
    Destroyed,
}

impl MissileStatus {
    /// 爆発段階のいずれかであればtrue
    pub fn is_exploding(self) -> bool {
        matches!(
            self,
            MissileStatus::ExplodingDirect
                | MissileStatus::ExplodingNear
                | MissileStatus::ExplodingFar
        )
    }
}

/// 飛翔中または爆発中のミサイル
///
/// ゲーム状態の一部として毎ターン丸ごと置き換えられます。
/// `distance <= range` が常に成り立ちます。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Missile {
    pub id: String,
    /// 発射したロボットのID
    pub robot_id: String,
    pub status: MissileStatus,
    pub x: f64,
    pub y: f64,
    /// 累積飛翔距離（m）
    pub distance: f64,
    /// 速度（m/s）
    pub speed: f64,
    /// 進行方位（度）
    pub heading: f64,
    /// 着弾距離（m）、武装の最大射程でクリップ済み
    pub range: f64,
    pub direct_hit_damage_bonus: f64,
    pub near_hit_damage_bonus: f64,
    pub far_hit_damage_bonus: f64,
}

impl Missile {
    /// 発射者IDと発射通番からミサイルIDを生成
    pub fn generate_id(robot_id: &str, fired_count: u32) -> String {
        format!("{robot_id}:M{fired_count}")
    }

    /// 新しいミサイルを発射位置に生成します
    ///
    /// # 引数
    ///
    /// * `robot_id` - 発射したロボットのID
    /// * `fired_count` - 発射後のロボットの累計発射数（ID生成用）
    /// * `(x, y)` - 発射位置
    /// * `weapon` - 発射したロボットの武装
    /// * `heading` - 発射方位（度、正規化前でも可）
    /// * `distance` - 要求着弾距離（m）
    pub fn fire(
        robot_id: &str,
        fired_count: u32,
        (x, y): (f64, f64),
        weapon: &MissileWeapon,
        heading: f64,
        distance: f64,
    ) -> Self {
        Self {
            id: Self::generate_id(robot_id, fired_count),
            robot_id: robot_id.to_string(),
            status: MissileStatus::Flying,
            x,
            y,
            distance: 0.0,
            speed: weapon.velocity,
            heading: math_utils::normalize_angle_180(heading),
            range: distance.min(weapon.range).max(0.0),
            direct_hit_damage_bonus: weapon.direct_hit_damage_bonus,
            near_hit_damage_bonus: weapon.near_hit_damage_bonus,
            far_hit_damage_bonus: weapon.far_hit_damage_bonus,
        }
    }

    /// 移動結果を反映したコピーを返す
    pub fn do_move(self, move_data: MoveData) -> Self {
        Self {
            x: move_data.x,
            y: move_data.y,
            distance: move_data.distance,
            ..self
        }
    }

    /// 着弾位置で直撃爆発に遷移したコピーを返す
    pub fn explode_at(self, move_data: MoveData) -> Self {
        Self {
            status: MissileStatus::ExplodingDirect,
            speed: 0.0,
            ..self.do_move(move_data)
        }
    }

    /// 爆発段階を1つ進めたコピーを返す
    ///
    /// 飛翔中はそのまま、想定外の状態は消滅へ強制遷移します。
    pub fn update_explode_status(self) -> Self {
        let status = match self.status {
            MissileStatus::Flying => MissileStatus::Flying,
            MissileStatus::ExplodingDirect => MissileStatus::ExplodingNear,
            MissileStatus::ExplodingNear => MissileStatus::ExplodingFar,
            MissileStatus::ExplodingFar => MissileStatus::Destroyed,
            MissileStatus::Undefined | MissileStatus::Destroyed => MissileStatus::Destroyed,
        };
        Self { status, ..self }
    }
}

impl Locatable for Missile {
    fn id(&self) -> &str {
        &self.id
    }

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}
