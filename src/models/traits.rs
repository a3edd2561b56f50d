/// 盤面上に位置を持つオブジェクトのインターフェース
///
/// ロボットとミサイルが実装し、距離順の探索や衝突判定で共通に扱われます。
pub trait Locatable {
    /// オブジェクトIDの取得
    fn id(&self) -> &str;

    /// 現在のX座標（m）
    fn x(&self) -> f64;

    /// 現在のY座標（m）
    fn y(&self) -> f64;
}
