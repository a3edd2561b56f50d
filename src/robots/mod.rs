//! # 組み込みロボット
//!
//! プロセス内で動くロボットのブレイン実装です。[`register_builtin`] で
//! [`LocalRobotService`] にハンドル名付きで登録されます。
//!
//! | ハンドル | 振る舞い |
//! |---|---|
//! | `target` | 動かず撃たない標的 |
//! | `yosemite-sam` | 走り回りながらランダムに撃つ |
//! | `robo-dog` | 正面を走査し、見つけた相手かランダムな地点を撃つ |
//! | `hot-shot` | 扇状に走査して狙い撃ち、被弾や空振りで移動する |
//! | `bring-your-own` | 自作ロボットのひな形 |

pub mod bring_your_own;
pub mod hot_shot;
pub mod robo_dog;
pub mod target;
pub mod yosemite_sam;

use crate::service::LocalRobotService;

pub use bring_your_own::BringYourOwnRobot;
pub use hot_shot::HotShot;
pub use robo_dog::RoboDog;
pub use target::TargetRobot;
pub use yosemite_sam::YosemiteSam;

/// 組み込みロボットのハンドル名
pub const BUILTIN_HANDLES: [&str; 5] = [
    "bring-your-own",
    "hot-shot",
    "robo-dog",
    "target",
    "yosemite-sam",
];

/// 組み込みロボットをすべて登録する
pub fn register_builtin(service: &mut LocalRobotService) {
    service.register("target", TargetRobot::new);
    service.register("yosemite-sam", YosemiteSam::new);
    service.register("robo-dog", RoboDog::new);
    service.register("hot-shot", HotShot::new);
    service.register("bring-your-own", BringYourOwnRobot::new);
}

/// 組み込みロボット登録済みのサービスを作る
pub fn builtin_service() -> LocalRobotService {
    let mut service = LocalRobotService::new();
    register_builtin(&mut service);
    service
}
