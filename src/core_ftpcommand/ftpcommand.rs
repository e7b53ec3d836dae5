#[derive(Eq, Hash, PartialEq, Debug, Clone, Copy)]
pub enum FtpCommand {
    USER,
    PASS,
    SYST,
    TYPE,
    QUIT,
    NOOP,
    PORT,
    PASV,
    LIST,
    CWD,
    PWD,
    MKD,
    RMD,
    DELE,
    RNFR,
    RNTO,
    STOR,
    RETR,
}

impl FtpCommand {
    pub fn from_str(cmd: &str) -> Option<FtpCommand> {
        match cmd.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::USER),
            "PASS" => Some(FtpCommand::PASS),
            "SYST" => Some(FtpCommand::SYST),
            "TYPE" => Some(FtpCommand::TYPE),
            "QUIT" => Some(FtpCommand::QUIT),
            "NOOP" => Some(FtpCommand::NOOP),
            "PORT" => Some(FtpCommand::PORT),
            "PASV" => Some(FtpCommand::PASV),
            "LIST" => Some(FtpCommand::LIST),
            "CWD" => Some(FtpCommand::CWD),
            "PWD" => Some(FtpCommand::PWD),
            "MKD" => Some(FtpCommand::MKD),
            "RMD" => Some(FtpCommand::RMD),
            "DELE" => Some(FtpCommand::DELE),
            "RNFR" => Some(FtpCommand::RNFR),
            "RNTO" => Some(FtpCommand::RNTO),
            "STOR" => Some(FtpCommand::STOR),
            "RETR" => Some(FtpCommand::RETR),
            _ => None,
        }
    }

    /// Commands rejected with 530 until USER/PASS succeeds.
    pub fn requires_login(&self) -> bool {
        !matches!(
            self,
            FtpCommand::USER
                | FtpCommand::PASS
                | FtpCommand::SYST
                | FtpCommand::TYPE
                | FtpCommand::QUIT
                | FtpCommand::NOOP
        )
    }
}
