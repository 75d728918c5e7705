mod assembler;
mod config;
mod docx;
mod logging;
mod models;

use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::info;

use assembler::{DocumentAssembler, GenerateError};
use config::{ConfigError, GenerationConfig, RawConfig};
use docx::DocxError;
use logging::{LogConfig, LogOutput, init_logging, level_for_verbosity, parse_log_level};
use models::WeaponProfile;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("targetsheet")
        .version("0.1.0")
        .about("射撃練習用 的シート生成 (Target Sheet Generator)")
        .long_about("交代・標的台・的の番号を付けた的シート (.docx) を生成します。\n\
                     ライフルは8×8cmの的を1ページ6枚、ピストルは17×17cmと8×8cmの的を1ページ3枚配置します。")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("設定ファイル(.yaml)のパスを指定")
                .long_help("設定ファイル(.yaml)のパスを指定します。\n\
                           コマンドラインで指定した項目は設定ファイルより優先されます。")
        )
        .arg(
            Arg::new("weapon")
                .short('w')
                .long("weapon")
                .value_name("WEAPON")
                .value_parser(parse_weapon)
                .help("武器 (rifle | pistol)")
        )
        .arg(
            Arg::new("exercise")
                .short('e')
                .long("exercise")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("練習の総弾数 (20 / 30 / 40 / 60)")
        )
        .arg(
            Arg::new("exercise-mode")
                .short('m')
                .long("exercise-mode")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("1的あたりの弾数 (ライフル 40/60 のみ: 1 または 2)")
        )
        .arg(
            Arg::new("shifts")
                .short('s')
                .long("shifts")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .help("交代数")
        )
        .arg(
            Arg::new("shields")
                .long("shields")
                .value_name("LIST")
                .value_delimiter(',')
                .value_parser(parse_shield)
                .action(ArgAction::Append)
                .help("標的台の番号 (カンマ区切り, 例: 1,2,5)")
        )
        .arg(
            Arg::new("small-image")
                .long("small-image")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("8×8cm の的画像")
        )
        .arg(
            Arg::new("large-image")
                .long("large-image")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .help("17×17cm の的画像")
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("出力ディレクトリ")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("設定の情報のみ表示して終了")
                .conflicts_with("list")
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .action(ArgAction::SetTrue)
                .help("生成される番号の一覧を表示して終了")
                .conflicts_with("info")
        )
        .arg(
            Arg::new("inspect")
                .long("inspect")
                .value_name("DOCX")
                .value_parser(clap::value_parser!(PathBuf))
                .help("生成済みの的シートの画像配置を表示して終了")
                .conflicts_with_all(["config", "info", "list"])
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: デバッグ)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("OUTPUT")
                .value_parser(["console", "file", "both"])
                .default_value("console")
                .help("ログ出力先")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)")
                .long_help("ログレベルを指定します。\n\
                           指定しない場合は -v の数から決定されます。")
        )
        .get_matches();

    println!("的シート生成 (Target Sheet Generator) - targetsheet v0.1.0");
    println!();

    // 詳細レベルの設定
    let verbose_level = matches.get_count("verbose");
    if verbose_level > 0 {
        println!("詳細出力レベル: {}", verbose_level);
    }

    if let Err(e) = setup_logging(&matches, verbose_level) {
        eprintln!("ログ初期化エラー: {}", e);
        std::process::exit(1);
    }

    if let Some(path) = matches.get_one::<PathBuf>("inspect") {
        if let Err(e) = inspect(path) {
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(&matches, verbose_level) {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn parse_weapon(s: &str) -> Result<WeaponProfile, String> {
    s.parse()
}

fn parse_shield(s: &str) -> Result<u32, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("無効な標的台の番号: {}", s))
}

/// ログ設定を引数から組み立てて初期化
fn setup_logging(matches: &ArgMatches, verbose_level: u8) -> Result<(), Box<dyn std::error::Error>> {
    let output = match matches.get_one::<String>("log-output") {
        Some(value) => value.parse::<LogOutput>()?,
        None => LogOutput::Console,
    };
    let level = match matches.get_one::<String>("log-level") {
        Some(value) => parse_log_level(value),
        None => level_for_verbosity(verbose_level),
    };

    init_logging(LogConfig {
        level,
        output,
        ..LogConfig::default()
    })
}

/// コマンドラインで指定された項目
fn overrides_from(matches: &ArgMatches) -> RawConfig {
    let shields: Option<Vec<u32>> = matches
        .get_many::<u32>("shields")
        .map(|values| values.copied().collect());

    RawConfig {
        weapon: matches.get_one::<WeaponProfile>("weapon").copied(),
        exercise: matches.get_one::<u32>("exercise").copied(),
        exercise_mode: matches.get_one::<u32>("exercise-mode").copied(),
        shifts: matches.get_one::<u32>("shifts").copied(),
        shields,
        images: None,
        output_dir: matches.get_one::<PathBuf>("output-dir").cloned(),
    }
}

/// 設定ファイルとコマンドラインから生成設定を組み立て
fn load_config(matches: &ArgMatches) -> Result<GenerationConfig, ConfigError> {
    let overrides = overrides_from(matches);

    let raw = match matches.get_one::<String>("config") {
        Some(path) => {
            info!("設定ファイル読み込み: {}", path);
            RawConfig::from_file(path)?.merge(overrides)
        }
        None => overrides,
    };

    let mut config = raw.into_config()?;

    // 画像パスは個別に上書き
    if let Some(path) = matches.get_one::<PathBuf>("small-image") {
        config.images.small_target = path.clone();
    }
    if let Some(path) = matches.get_one::<PathBuf>("large-image") {
        config.images.large_target = path.clone();
    }

    Ok(config)
}

/// 生成済みの的シートに含まれる浮動画像を一覧表示
fn inspect(path: &Path) -> Result<(), DocxError> {
    let anchors = docx::package::read_anchors(path)?;

    println!("=== {} ===", path.display());
    println!("浮動画像: {}", anchors.len());
    for anchor in &anchors {
        println!(
            "  #{:<3} {:<6} {:<24} x={:>6.1}pt y={:>6.1}pt  {:.1}×{:.1}cm",
            anchor.shape_id,
            anchor.relationship_id,
            anchor.filename,
            anchor.pos_x.as_pt(),
            anchor.pos_y.as_pt(),
            anchor.width.as_cm(),
            anchor.height.as_cm(),
        );
    }

    Ok(())
}

/// 設定を読み込んで的シートを生成
fn run(matches: &ArgMatches, verbose_level: u8) -> Result<(), GenerateError> {
    let config = load_config(matches)?;

    config.print_summary();

    // 情報表示のみの場合
    if matches.get_flag("info") {
        return Ok(());
    }

    let mut assembler = DocumentAssembler::new(&config, verbose_level);

    if matches.get_flag("list") {
        for code in &assembler.codes {
            println!("{}", code);
        }
        return Ok(());
    }

    if assembler.codes.is_empty() {
        println!("生成する番号がありません。");
    }

    assembler.assemble()?;

    let timestamp = chrono::Local::now().naive_local();
    let path = assembler.save_to_dir(&config, timestamp)?;

    println!("保存しました: {}", path.display());
    if verbose_level > 0 {
        println!("ラベル数: {}", assembler.codes.len());
    }

    Ok(())
}
